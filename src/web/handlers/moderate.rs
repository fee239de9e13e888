// POST /format-message: score a message and return it, possibly rewritten.
//
// Returns 200 with a ModerationResponse, or the error code's status (400,
// 408, 500) with a ModerationError. A body that isn't a JSON object is
// treated as a request without a usable message.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tracing::debug;

use crate::moderation::budget::TimeBudget;
use crate::moderation::models::{ErrorCode, ModerationError, ModerationRequest};
use crate::web::{api_error, status_for, AppState, RequestArrival};

impl IntoResponse for ModerationError {
    fn into_response(self) -> Response {
        api_error(status_for(self.code), self)
    }
}

pub async fn format_message(
    State(state): State<AppState>,
    Extension(RequestArrival(arrived)): Extension<RequestArrival>,
    payload: Result<Json<ModerationRequest>, JsonRejection>,
) -> Response {
    let budget = TimeBudget::starting_at(arrived, state.moderator.config().time_budget);

    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            debug!(error = %rejection, "Rejected request body");
            return ModerationError::new(
                ErrorCode::InvalidMessage,
                "Invalid request",
                rejection.body_text(),
            )
            .into_response();
        }
    };

    match state.moderator.process(request, budget).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}
