use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    analytics::{AnalyticsSummary, summarize},
    auth::RequestContext,
    db::entries::EntryRepository,
};

const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 365;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<u32>,
}

impl SummaryQuery {
    fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/analytics/summary", get(get_summary))
}

#[instrument(name = "analytics.summary", skip(state, ctx, query), fields(user_id = %ctx.user.id))]
async fn get_summary(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<AnalyticsSummary>, ErrorResponse> {
    let days = query.days();
    let now = Utc::now();
    let since = now - Duration::days(i64::from(days));

    let entries = EntryRepository::new(state.pool())
        .list_between(ctx.user.family_id, Some(since), None)
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to load entries"))?;

    Ok(Json(summarize(&entries, days, now, state.utc_offset())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_default_and_clamp() {
        assert_eq!(SummaryQuery::default().days(), 30);
        assert_eq!(SummaryQuery { days: Some(0) }.days(), 1);
        assert_eq!(SummaryQuery { days: Some(9999) }.days(), 365);
        assert_eq!(SummaryQuery { days: Some(14) }.days(), 14);
    }
}
