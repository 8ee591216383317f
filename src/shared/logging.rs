//! Logging utilities module
//!
//! Subscriber setup plus the structured events shared by both RPC surfaces.

use crate::shared::error::{AppError, AppResult};
use tracing::{error, info, warn};

/// Logging utilities for the application
pub struct LoggingUtils;

impl LoggingUtils {
    /// Initialize the global subscriber.
    ///
    /// `RUST_LOG` wins over `level` when set. `format` is `json` or `text`.
    pub fn initialize(level: &str, format: &str) -> AppResult<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let builder = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let result = if format.eq_ignore_ascii_case("json") {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };

        result.map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))
    }

    /// Log a failed bbc call with everything needed to correlate it
    pub fn log_bbc_failure(
        product: &str,
        domain: &str,
        request: &str,
        error_code: i32,
        error_msg: &str,
    ) {
        error!(
            product = %product,
            domain = %domain,
            request = %request,
            error_code = error_code,
            error_msg = %error_msg,
            "bbc call failed"
        );
    }

    pub fn log_manage_failure(operation: &str, target: &str, error_code: i32, error_msg: &str) {
        error!(
            operation = %operation,
            target = %target,
            error_code = error_code,
            error_msg = %error_msg,
            "plugin management failed"
        );
    }

    pub fn log_manage_success(operation: &str, target: &str) {
        info!(operation = %operation, target = %target, "plugin management succeeded");
    }

    /// A failure that is logged but does not change the caller's outcome
    pub fn log_best_effort_failure(action: &str, target: &str, reason: &str) {
        warn!(action = %action, target = %target, reason = %reason, "best effort action failed");
    }

    /// Generate a unique request ID
    pub fn generate_request_id() -> String {
        format!("req_{}", uuid::Uuid::new_v4().simple())
    }
}
