//! Logging setup and request-scoped context.
//!
//! Request ids live in a tokio task-local so every log line emitted while
//! handling a request can carry the id without threading it through calls.

use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Timer that uses the local timezone (respects TZ).
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Build the filter string: `RUST_LOG` wins over the configured level, and
/// HTTP library noise is always capped at `warn`.
fn filter_directives(default_level: &str, rust_log: Option<String>) -> String {
    let base = rust_log.unwrap_or_else(|| format!("{},open_gateway={}", default_level, default_level));
    format!("{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn", base)
}

/// Install the global tracing subscriber.
///
/// Set `NO_COLOR` to disable ANSI escapes when logging to a file.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::new(filter_directives(
        default_level,
        std::env::var("RUST_LOG").ok(),
    ));
    let ansi = std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTime)
                .with_ansi(ansi),
        )
        .init();
}
