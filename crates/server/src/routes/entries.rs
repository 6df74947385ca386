use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::{PageQuery, children::child_error, error::ErrorResponse};
use crate::{
    AppState,
    analytics::{EntryFilter, local_date},
    auth::RequestContext,
    db::{
        children::ChildRepository,
        entries::{CreateEntryData, EntryError, EntryRepository, JournalEntry, UpdateEntryData},
    },
    llm::generate_entry_feedback,
};

#[derive(Debug, Deserialize)]
pub struct CreateEntryRequest {
    #[serde(flatten)]
    pub entry: CreateEntryData,
    #[serde(default)]
    pub request_ai_feedback: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/search", get(search_entries))
        .route(
            "/entries/{entry_id}",
            get(get_entry).patch(update_entry).delete(delete_entry),
        )
        .route("/entries/{entry_id}/favorite", post(toggle_favorite))
        .route("/entries/{entry_id}/feedback", post(request_feedback))
}

fn entry_error(error: EntryError, context: &str) -> ErrorResponse {
    match error {
        EntryError::NotFound => ErrorResponse::not_found("journal entry not found"),
        EntryError::Invalid(message) => ErrorResponse::bad_request(message),
        other => ErrorResponse::internal(other, context),
    }
}

/// Entries may only reference children of the author's own family.
async fn ensure_child(
    state: &AppState,
    family_id: Uuid,
    child_id: Option<Uuid>,
) -> Result<(), ErrorResponse> {
    let Some(child_id) = child_id else {
        return Ok(());
    };
    ChildRepository::new(state.pool())
        .find(family_id, child_id)
        .await
        .map(|_| ())
        .map_err(|error| child_error(error, "failed to load child profile"))
}

/// Ask the LLM for a reflection and store it. Returns the entry untouched when
/// no client is configured or generation fails.
async fn attach_feedback(state: &AppState, entry: JournalEntry) -> Result<JournalEntry, ErrorResponse> {
    let Some(llm) = state.llm() else {
        tracing::debug!(entry_id = %entry.id, "no LLM configured; skipping feedback");
        return Ok(entry);
    };

    let child_age = match entry.child_id {
        Some(child_id) => ChildRepository::new(state.pool())
            .find(entry.family_id, child_id)
            .await
            .ok()
            .and_then(|child| child.age_in_months(local_date(Utc::now(), state.utc_offset()))),
        None => None,
    };

    let Some(feedback) = generate_entry_feedback(llm.as_ref(), &entry, child_age).await else {
        return Ok(entry);
    };

    EntryRepository::new(state.pool())
        .set_ai_feedback(
            entry.family_id,
            entry.id,
            &feedback.feedback,
            feedback.developmental_insight.as_deref(),
        )
        .await
        .map_err(|error| entry_error(error, "failed to store feedback"))
}

#[instrument(name = "entries.list", skip(state, ctx, page), fields(user_id = %ctx.user.id))]
async fn list_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<JournalEntry>>, ErrorResponse> {
    EntryRepository::new(state.pool())
        .list(ctx.user.family_id, page.limit(), page.offset())
        .await
        .map(Json)
        .map_err(|error| entry_error(error, "failed to list entries"))
}

#[instrument(name = "entries.search", skip(state, ctx, filter), fields(user_id = %ctx.user.id))]
async fn search_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(filter): Query<EntryFilter>,
) -> Result<Json<Vec<JournalEntry>>, ErrorResponse> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(ErrorResponse::bad_request("`from` must not be after `to`"));
    }

    let offset = state.utc_offset();
    let (since, until) = filter.bounds(offset);
    let entries = EntryRepository::new(state.pool())
        .list_between(ctx.user.family_id, since, until)
        .await
        .map_err(|error| entry_error(error, "failed to search entries"))?;

    Ok(Json(filter.apply(entries, offset)))
}

#[instrument(name = "entries.get", skip(state, ctx), fields(user_id = %ctx.user.id, entry_id = %entry_id))]
async fn get_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<JournalEntry>, ErrorResponse> {
    EntryRepository::new(state.pool())
        .find(ctx.user.family_id, entry_id)
        .await
        .map(Json)
        .map_err(|error| entry_error(error, "failed to load entry"))
}

#[instrument(name = "entries.create", skip(state, ctx, payload), fields(user_id = %ctx.user.id))]
async fn create_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateEntryRequest>,
) -> Result<(StatusCode, Json<JournalEntry>), ErrorResponse> {
    payload
        .entry
        .validate()
        .map_err(|error| entry_error(error, "failed to create entry"))?;
    ensure_child(&state, ctx.user.family_id, payload.entry.child_id).await?;

    let mut entry = EntryRepository::new(state.pool())
        .create(ctx.user.family_id, ctx.user.id, payload.entry)
        .await
        .map_err(|error| entry_error(error, "failed to create entry"))?;

    if payload.request_ai_feedback {
        entry = attach_feedback(&state, entry).await?;
    }

    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(name = "entries.update", skip(state, ctx, payload), fields(user_id = %ctx.user.id, entry_id = %entry_id))]
async fn update_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<UpdateEntryData>,
) -> Result<Json<JournalEntry>, ErrorResponse> {
    ensure_child(&state, ctx.user.family_id, payload.child_id).await?;

    EntryRepository::new(state.pool())
        .update(ctx.user.family_id, entry_id, payload)
        .await
        .map(Json)
        .map_err(|error| entry_error(error, "failed to update entry"))
}

#[instrument(name = "entries.toggle_favorite", skip(state, ctx), fields(user_id = %ctx.user.id, entry_id = %entry_id))]
async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<JournalEntry>, ErrorResponse> {
    EntryRepository::new(state.pool())
        .toggle_favorite(ctx.user.family_id, entry_id)
        .await
        .map(Json)
        .map_err(|error| entry_error(error, "failed to toggle favorite"))
}

#[instrument(name = "entries.feedback", skip(state, ctx), fields(user_id = %ctx.user.id, entry_id = %entry_id))]
async fn request_feedback(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<JournalEntry>, ErrorResponse> {
    let entry = EntryRepository::new(state.pool())
        .find(ctx.user.family_id, entry_id)
        .await
        .map_err(|error| entry_error(error, "failed to load entry"))?;

    attach_feedback(&state, entry).await.map(Json)
}

#[instrument(name = "entries.delete", skip(state, ctx), fields(user_id = %ctx.user.id, entry_id = %entry_id))]
async fn delete_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<StatusCode, ErrorResponse> {
    EntryRepository::new(state.pool())
        .delete(ctx.user.family_id, entry_id)
        .await
        .map_err(|error| entry_error(error, "failed to delete entry"))?;

    Ok(StatusCode::NO_CONTENT)
}
