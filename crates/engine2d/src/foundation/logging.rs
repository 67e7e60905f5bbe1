//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

use log::LevelFilter;

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level, still overridable through `RUST_LOG`
///
/// Unknown level names fall back to `info`. Calling this twice is harmless; the
/// second call is ignored.
pub fn init_with_level(level: &str) {
    let filter = parse_level(level);
    let result = env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .try_init();
    if result.is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}

/// Map a config level string onto a [`LevelFilter`]
pub fn parse_level(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("nonsense"), LevelFilter::Info);
    }
}
