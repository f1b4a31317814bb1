//! repair-lab library crate
//!
//! Multi-round LLM code repair over benchmark datasets, and the pass-rate
//! statistics computed from the stored results. The binary is a thin clap
//! front end over [`pipeline`]; benchmarks and tests use the modules directly.

pub mod config;
pub mod dataset;
pub mod error;
pub mod feedback;
pub mod lab;
pub mod llm;
pub mod paths;
pub mod pipeline;
pub mod repair;
pub mod score;
pub mod util;

use error::RepairError;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` selects the filter (default `info`). `LOG_FORMAT=json` switches
/// to structured JSON lines; anything else gets the human-readable format.
/// Logs go to stderr so stdout carries only the run summary.
pub fn init_tracing() -> Result<(), RepairError> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let result = match format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    result.map_err(|e| RepairError::InvalidConfig(format!("tracing init failed: {e}")))
}
