use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` uses the `env_logger` filter syntax, e.g.
/// `"info,nabu_engine::swapchain=debug,wgpu_core=warn"`. When absent, `RUST_LOG`
/// is consulted and `default_level` applies after that.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
    /// Prefix records with a timestamp.
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn with_level(mut self, level: log::LevelFilter) -> Self {
        self.default_level = level;
        self
    }
}

static INIT: Once = Once::new();

/// Installs the global logger.
///
/// Only the first call has an effect. Returns `true` when this call installed
/// the logger; `false` if it was already installed (by us or by the host).
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;

    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(config.default_level);

        match config.env_filter {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                if let Ok(filter) = std::env::var("RUST_LOG") {
                    builder.parse_filters(&filter);
                }
            }
        }

        builder.write_style(config.write_style);
        if !config.timestamps {
            builder.format_timestamp(None);
        }

        // A host application may already own the logger.
        installed = builder.try_init().is_ok();
        if installed {
            log::debug!("logging initialized");
        }
    });

    installed
}
