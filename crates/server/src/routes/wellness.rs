use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    routing::get,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::error::ErrorResponse;
use crate::{
    AppState,
    auth::RequestContext,
    db::entries::EntryRepository,
    wellness::{
        SUGGESTION_CAP, Suggestion, TimeOfDay, WellnessContext, effective_limit,
        library::LIBRARY, personalized_suggestion, select_suggestions,
    },
};

const CONTEXT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    #[serde(default = "default_max_per_day")]
    pub max_per_day: usize,
    #[serde(default)]
    pub personalized: bool,
}

fn default_max_per_day() -> usize {
    SUGGESTION_CAP
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
    pub mood_average: Option<f64>,
    pub time_of_day: TimeOfDay,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/wellness/suggestions", get(get_suggestions))
}

#[instrument(name = "wellness.suggestions", skip(state, ctx, query), fields(user_id = %ctx.user.id))]
async fn get_suggestions(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<SuggestionsResponse>, ErrorResponse> {
    let now = Utc::now();
    let recent = EntryRepository::new(state.pool())
        .list_between(
            ctx.user.family_id,
            Some(now - Duration::days(CONTEXT_WINDOW_DAYS)),
            None,
        )
        .await
        .map_err(|error| ErrorResponse::internal(error, "failed to load recent entries"))?;

    let context = WellnessContext::from_entries(&recent, TimeOfDay::at(now, state.utc_offset()));
    let limit = effective_limit(query.max_per_day);

    let mut suggestions = select_suggestions(LIBRARY, &context, limit, &mut rand::rng());

    if query.personalized
        && limit > 0
        && let Some(llm) = state.llm()
        && let Some(personal) = personalized_suggestion(llm.as_ref(), &context).await
    {
        // the personalised pick leads; the cap still applies
        suggestions.insert(0, personal);
        suggestions.truncate(limit);
    }

    Ok(Json(SuggestionsResponse {
        suggestions,
        mood_average: context.mood_average,
        time_of_day: context.time_of_day,
    }))
}
