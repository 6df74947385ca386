use axum::{Extension, Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::RequestContext,
    db::{
        children::{ChildProfile, ChildRepository},
        entries::{EntryRepository, JournalEntry},
        families::{Family, FamilyRepository},
        milestones::{Milestone, MilestoneRepository},
        notification_settings::{NotificationSettings, NotificationSettingsRepository},
        parent_profiles::{ParentProfile, ParentProfileError, ParentProfileRepository},
    },
};

/// Everything a family has stored, for download.
#[derive(Debug, Serialize)]
pub struct ExportDocument {
    pub exported_at: DateTime<Utc>,
    pub family: Family,
    pub parent_profile: Option<ParentProfile>,
    pub children: Vec<ChildProfile>,
    pub milestones: Vec<Milestone>,
    pub entries: Vec<JournalEntry>,
    pub notification_settings: NotificationSettings,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/export", get(export_data))
}

#[instrument(name = "export.download", skip(state, ctx), fields(user_id = %ctx.user.id))]
async fn export_data(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<ExportDocument>, ErrorResponse> {
    let pool = state.pool();
    let family_id = ctx.user.family_id;
    let failed = "failed to export data";

    let family = FamilyRepository::new(pool)
        .find_by_id(family_id)
        .await
        .map_err(|error| ErrorResponse::internal(error, failed))?;

    let parent_profile = match ParentProfileRepository::new(pool)
        .find_by_user(ctx.user.id)
        .await
    {
        Ok(profile) => Some(profile),
        Err(ParentProfileError::NotFound) => None,
        Err(error) => return Err(ErrorResponse::internal(error, failed)),
    };

    let children = ChildRepository::new(pool)
        .list(family_id)
        .await
        .map_err(|error| ErrorResponse::internal(error, failed))?;

    let milestones = MilestoneRepository::new(pool)
        .list_for_family(family_id)
        .await
        .map_err(|error| ErrorResponse::internal(error, failed))?;

    let entries = EntryRepository::new(pool)
        .list_between(family_id, None, None)
        .await
        .map_err(|error| ErrorResponse::internal(error, failed))?;

    let notification_settings = NotificationSettingsRepository::new(pool)
        .get_or_default(ctx.user.id)
        .await
        .map_err(|error| ErrorResponse::internal(error, failed))?;

    tracing::info!(entries = entries.len(), children = children.len(), "data exported");

    Ok(Json(ExportDocument {
        exported_at: Utc::now(),
        family,
        parent_profile,
        children,
        milestones,
        entries,
        notification_settings,
    }))
}
