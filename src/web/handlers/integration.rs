// GET /integration.json: the static descriptor built at startup.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::web::AppState;

pub async fn integration_json(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.descriptor.as_ref().clone())
}
