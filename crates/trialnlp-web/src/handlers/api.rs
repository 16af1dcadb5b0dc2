//! JSON views of the current session.

use axum::{extract::State, Json};

use trialnlp_common::{EntityMention, Trial};

use crate::state::SharedState;

/// GET /api/trials
pub async fn api_trials(State(state): State<SharedState>) -> Json<Vec<Trial>> {
    Json(state.session.read().await.trials.clone())
}

/// GET /api/entities
pub async fn api_entities(State(state): State<SharedState>) -> Json<Vec<EntityMention>> {
    Json(state.session.read().await.entities.clone())
}
