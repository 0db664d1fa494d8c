use tracing_subscriber::EnvFilter;

/// Map a `LOG_LEVEL` value (`DEBUG`, `INFO`, `WARNING`, `ERROR`, `CRITICAL`)
/// to a tracing directive. Unknown values fall back to `info`.
pub fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(|l| l.trim().to_ascii_uppercase()).as_deref() {
        Some("TRACE") => "trace",
        Some("DEBUG") => "debug",
        Some("WARNING") | Some("WARN") => "warn",
        Some("ERROR") | Some("CRITICAL") => "error",
        _ => "info",
    }
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` decides. `RUST_LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").ok();
        EnvFilter::new(level_directive(level.as_deref()))
    });

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
