use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use crate::core::{ClientError, Result};

/// 安装全局 tracing subscriber，`RUST_LOG` 优先于配置中的级别
pub fn init(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| ClientError::config(format!("invalid log level {level:?}: {err}")))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact().with_target(true))
        .try_init()
        .map_err(|err| ClientError::config(format!("failed to install tracing subscriber: {err}")))
}
