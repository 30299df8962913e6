mod filters;

pub use filters::build_filter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный subscriber: `EnvFilter` и fmt-слой в stderr.
///
/// `level`: директива по умолчанию (например `"info"` или
/// `"nvstore=trace"`); `RUST_LOG` имеет приоритет. Повторный вызов
/// возвращает ошибку, а не паникует.
pub fn init_logging(level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = build_filter(level);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .try_init()?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        level,
        "Logging system initialized"
    );
    Ok(())
}
