use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
/// Output goes to stderr so the CLI can keep stdout for sample tables.
pub fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(level)));

    if cfg!(debug_assertions) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .with_target(false)
            .try_init();
    }
}

fn normalize_level(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        value @ ("trace" | "debug" | "info" | "warn" | "error" | "off") => value.to_string(),
        _ => "info".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_level;

    #[test]
    fn maps_config_levels_to_filter_directives() {
        assert_eq!(normalize_level("INFO"), "info");
        assert_eq!(normalize_level(" Warning "), "warn");
        assert_eq!(normalize_level("debug"), "debug");
        assert_eq!(normalize_level("verbose"), "info");
        assert_eq!(normalize_level(""), "info");
    }
}
