use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// tracing 구독자 초기화 (stderr)
///
/// `RUST_LOG`가 없으면 `txpilot=warn`, `--debug`면 `txpilot=debug`.
/// `TXPILOT_LOG_FORMAT=json`이면 JSON 한 줄씩.
pub fn init(debug: bool) {
    let env_filter = if debug {
        EnvFilter::new("txpilot=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("txpilot=warn"))
    };

    let json = std::env::var("TXPILOT_LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // 이미 초기화된 경우(테스트 등)는 무시
    let _ = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
}
