use tracing_subscriber::EnvFilter;

/// Фильтр событий: `RUST_LOG`, если задан и корректен, иначе `default_level`.
///
/// Некорректная директива не роняет процесс, используется `info`.
pub fn build_filter(default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    match EnvFilter::try_new(default_level) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Invalid log filter directive '{default_level}': {e}; falling back to 'info'");
            EnvFilter::new("info")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    /// Без RUST_LOG используется переданный уровень.
    #[test]
    #[serial]
    fn test_build_filter_no_env() {
        env::remove_var("RUST_LOG");
        let filter = build_filter("nvstore=debug");
        assert_eq!(filter.to_string(), "nvstore=debug");
    }

    #[test]
    #[serial]
    fn test_build_filter_env_wins() {
        env::set_var("RUST_LOG", "warn");
        let filter = build_filter("debug");
        env::remove_var("RUST_LOG");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    #[serial]
    fn test_build_filter_invalid_directive() {
        env::remove_var("RUST_LOG");
        let filter = build_filter("nvstore=loud");
        assert_eq!(filter.to_string(), "info");
    }
}
