

use skill_bridge::mcp::run_server;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "skill_bridge=warn,skill_bridge::mcp=info";

/// `RUST_LOG` wins when it parses; otherwise the quiet default.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP protocol; logs go to stderr
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(rust_log.as_deref()))
        .init();

    run_server().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_default() {
        let filter = log_filter(Some("skill_bridge=debug")).to_string();
        assert!(filter.contains("skill_bridge=debug"));
        assert!(!filter.contains("warn"));
    }

    #[test]
    fn test_default_filter_without_rust_log() {
        let filter = log_filter(None).to_string();
        assert!(filter.contains("skill_bridge=warn"));
        assert!(filter.contains("skill_bridge::mcp=info"));
    }
}
