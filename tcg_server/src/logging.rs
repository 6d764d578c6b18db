//! Structured logging configuration.
//!
//! Installs a `tracing` subscriber that also receives the engine's `log`
//! records, and provides helpers for request and staff-action events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, defaulting to `info` with quieter
/// database and HTTP internals.
///
/// # Example
///
/// ```no_run
/// use tcg_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a staff override (forced round finish, disqualification, correction)
///
/// # Arguments
///
/// * `action` - Override performed
/// * `actor_id` - User who performed it
/// * `tournament_id` - Tournament affected
/// * `reason` - Reason or note supplied with the override
///
/// # Example
///
/// ```
/// use tcg_server::logging::log_admin_override;
///
/// log_admin_override("force_finish_round", 7, 12, "round time expired");
/// ```
pub fn log_admin_override(action: &str, actor_id: i64, tournament_id: i64, reason: &str) {
    tracing::warn!(
        action = action,
        actor_id = actor_id,
        tournament_id = tournament_id,
        "OVERRIDE: {}",
        reason
    );
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Request path
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `actor_id` - Optional acting user ID
///
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    actor_id: Option<i64>,
) {
    if status_code >= 500 {
        tracing::error!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            actor_id = actor_id,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            actor_id = actor_id,
            "API request completed"
        );
    }
}
