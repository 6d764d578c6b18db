//! Acting-user middleware for protected endpoints.
//!
//! Identity is established upstream (gateway or session service), which
//! forwards the authenticated user ID in the `x-actor-id` header. The
//! middleware parses it and injects the user ID into request extensions for
//! downstream handlers.
//!
//! # Extracting User ID
//!
//! In handler functions, extract the user ID from request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//!
//! async fn protected_handler(Extension(user_id): Extension<i64>) -> String {
//!     format!("Acting as user {}", user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// Header carrying the authenticated user ID
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Middleware that requires an acting user and injects its ID.
///
/// # Behavior
///
/// - **Valid header**: Injects `user_id: i64` into request extensions and calls the next handler
/// - **Missing header**: Returns `401 Unauthorized`
/// - **Not an integer**: Returns `401 Unauthorized`
pub async fn actor_middleware(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let actor_id = request
        .headers()
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok());

    match actor_id {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            Ok(next.run(request).await)
        }
        None => {
            tracing::debug!(uri = %request.uri(), "Rejected request without a valid actor ID");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
