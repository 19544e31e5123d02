//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise `civicconnect=<LOG_LEVEL>,info`.
//! `LOG_FORMAT=json` switches to one JSON object per line.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Args;

pub fn default_directive(log_level: &str) -> String {
    format!("civicconnect={},info", log_level)
}

/// Install the global subscriber
pub fn init(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&args.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    if args.json_logs() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        let directive = default_directive("debug");
        assert_eq!(directive, "civicconnect=debug,info");
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
