//! # Structured Logging Module
//!
//! Environment-aware structured logging for tracing chunk execution and
//! continuation scheduling across separate job executions.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_filter(EnvFilter::new(log_level)),
        );

        // Use try_init to avoid panic if a global subscriber already exists
        // (common when embedded in a host application that set its own).
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            environment = %environment,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("BATCHRUN_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for chunk executions
pub fn log_chunk_operation(
    operation: &str,
    cursor: usize,
    total: usize,
    processed: usize,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        cursor = cursor,
        total = total,
        processed = processed,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 CHUNK_OPERATION"
    );
}

/// Log structured data for per-item processing
pub fn log_item_operation(
    operation: &str,
    item_id: &str,
    group_key: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        item_id = %item_id,
        group_key = %group_key,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 ITEM_OPERATION"
    );
}

/// Log structured data for trigger scheduling
pub fn log_trigger_operation(
    operation: &str,
    trigger_id: Option<&str>,
    delay_ms: Option<u64>,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        trigger_id = trigger_id,
        delay_ms = delay_ms,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "⏰ TRIGGER_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
