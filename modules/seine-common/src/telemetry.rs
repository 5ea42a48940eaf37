use tracing_subscriber::EnvFilter;

/// Initialize logging. Call once at process startup.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("seine=info".parse().expect("valid directive")),
        )
        .init();
}
