use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Upper bound on how long exit waits for queued log events to ship.
#[cfg(feature = "loki")]
const LOKI_DRAIN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Log settings read from the environment.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `RUST_LOG` filter directive.
    pub filter: String,
    /// Loki push endpoint; shipping is off when unset.
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `LOKI_URL` only counts when `LOKI_ENABLED=true`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = lookup("LOKI_ENABLED")
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            filter: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            loki_url: lookup("LOKI_URL").filter(|_| loki_enabled),
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "price-monitor".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        }
    }
}

/// Keeps the log shipper alive for the length of one run. Call
/// [`LogGuard::flush`] before the process exits so queued events reach Loki.
#[derive(Default)]
pub struct LogGuard {
    #[cfg(feature = "loki")]
    loki: Option<(tracing_loki::BackgroundTaskController, tokio::task::JoinHandle<()>)>,
}

impl LogGuard {
    pub async fn flush(self) {
        #[cfg(feature = "loki")]
        {
            if let Some((controller, task)) = self.loki {
                controller.shutdown().await;
                if tokio::time::timeout(LOKI_DRAIN_TIMEOUT, task).await.is_err() {
                    tracing::warn!("Loki shipper did not drain within {:?}", LOKI_DRAIN_TIMEOUT);
                }
            }
        }
    }
}

/// Install the global subscriber. Must run inside the tokio runtime when
/// Loki shipping is configured.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard, Box<dyn std::error::Error>> {
    #[cfg(feature = "loki")]
    {
        if let Some(loki_url) = &config.loki_url {
            return init_with_loki(config, loki_url);
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    if config.loki_url.is_some() {
        tracing::warn!("LOKI_URL is set but this build has no Loki support");
    }

    Ok(LogGuard::default())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: &str) -> Result<LogGuard, Box<dyn std::error::Error>> {
    let (layer, controller, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_controller_url(url::Url::parse(loki_url)?)?;

    let handle = tokio::spawn(task);

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(tracing_subscriber::fmt::layer())
        .with(layer)
        .try_init()?;

    tracing::debug!("📊 Shipping logs to Loki at {}", loki_url);

    Ok(LogGuard {
        loki: Some((controller, handle)),
    })
}
