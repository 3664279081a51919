use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{levels::LevelSummary, AppState};

/// List playable levels without their answers
pub async fn list_levels(State(state): State<Arc<AppState>>) -> Json<Vec<LevelSummary>> {
    Json(state.catalog.summaries())
}
