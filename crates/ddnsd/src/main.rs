// # ddnsd - DDNS Daemon
//
// Thin integration layer: everything that decides what to publish lives in
// ddns-core and the driver crates.
//
// The daemon is responsible for:
// 1. Reading its settings from environment variables
// 2. Installing the tracing subscriber
// 3. Registering drivers and address resolvers
// 4. Running the scheduler until SIGTERM or SIGINT
//
// ## Environment
//
// - `DDNS_CONFIG_PATH`: JSON configuration file (default `./ddns_config.json`)
// - `DDNS_INTERVAL_SECS`: Seconds between cycles (default 300)
// - `DDNS_FIRST_DELAY_SECS`: Seconds before the first cycle (default 0)
// - `DDNS_IP_CACHE_TIMES`: Unchanged cycles before the provider is consulted anyway (default 5)
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export DDNS_CONFIG_PATH=/etc/ddns/ddns_config.json
// export DDNS_INTERVAL_SECS=600
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::{ConfigStore, ProviderRegistry, Scheduler, SchedulerEvent, SchedulerSettings};
use ddns_providers::{ReqwestTransport, WebhookNotifier};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon settings
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    config_path: PathBuf,
    interval: Duration,
    first_delay: Duration,
    ip_cache_times: u32,
    log_level: Level,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let number = |key: &str, default: u64| -> Result<u64> {
            match lookup(key) {
                Some(raw) if !raw.trim().is_empty() => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, raw)),
                _ => Ok(default),
            }
        };

        let interval = number("DDNS_INTERVAL_SECS", 300)?;
        if interval == 0 {
            anyhow::bail!("DDNS_INTERVAL_SECS must be at least 1");
        }
        let ip_cache_times = u32::try_from(number("DDNS_IP_CACHE_TIMES", 5)?)
            .context("DDNS_IP_CACHE_TIMES is too large")?;

        let log_level = lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_level = match log_level.trim().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                log_level
            ),
        };

        Ok(Self {
            config_path: lookup("DDNS_CONFIG_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./ddns_config.json")),
            interval: Duration::from_secs(interval),
            first_delay: Duration::from_secs(number("DDNS_FIRST_DELAY_SECS", 0)?),
            ip_cache_times,
            log_level,
        })
    }

    fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            first_delay: self.first_delay,
            interval: self.interval,
            ip_cache_times: self.ip_cache_times,
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    info!("Configuration file: {}", settings.config_path.display());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(settings).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the registry with every compiled-in driver and resolver
fn build_registry(transport: Arc<ReqwestTransport>) -> Result<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    ddns_providers::register(&registry, transport);

    #[cfg(feature = "http")]
    {
        ddns_ip_http::register(&registry).context("Failed to set up the url address resolver")?;
        debug!("Registered url address resolver");
    }

    #[cfg(feature = "local")]
    {
        ddns_ip_local::register(&registry);
        debug!("Registered netInterface address resolver");
    }

    info!("Registered providers: {}", registry.list_providers().join(", "));
    Ok(registry)
}

/// Run the daemon
async fn run_daemon(settings: Settings) -> Result<()> {
    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP transport")?);
    let registry = build_registry(transport.clone())?;
    let notifier = Arc::new(WebhookNotifier::new(transport));

    if !settings.config_path.exists() {
        warn!(
            "{} does not exist yet; cycles are skipped until it is created",
            settings.config_path.display()
        );
    }
    let store = Arc::new(ConfigStore::new(&settings.config_path));

    let (scheduler, events) = Scheduler::new(
        store,
        Arc::new(registry),
        notifier,
        settings.scheduler_settings(),
    );
    tokio::spawn(log_events(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling failed, shutting down: {:#}", e),
        }
        let _ = shutdown_tx.send(());
    });

    scheduler.run_with_shutdown(Some(shutdown_rx)).await?;
    info!("Shutting down daemon");
    Ok(())
}

/// Drain scheduler events into the log
async fn log_events(mut events: mpsc::Receiver<SchedulerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::EntryCompleted {
                provider,
                succeeded,
                failed,
            } if failed > 0 => warn!("[{}] {} updated, {} failed", provider, succeeded, failed),
            event => debug!("Scheduler event: {:?}", event),
        }
    }
}

/// Wait for SIGTERM or SIGINT
///
/// # Returns
///
/// The name of the signal received
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for SIGINT
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.config_path, PathBuf::from("./ddns_config.json"));
        assert_eq!(settings.interval, Duration::from_secs(300));
        assert_eq!(settings.first_delay, Duration::ZERO);
        assert_eq!(settings.ip_cache_times, 5);
        assert_eq!(settings.log_level, Level::INFO);
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            ("DDNS_CONFIG_PATH", "/etc/ddns/config.json"),
            ("DDNS_INTERVAL_SECS", "600"),
            ("DDNS_FIRST_DELAY_SECS", "30"),
            ("DDNS_IP_CACHE_TIMES", "10"),
            ("DDNS_LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();

        assert_eq!(settings.config_path, PathBuf::from("/etc/ddns/config.json"));
        let scheduler = settings.scheduler_settings();
        assert_eq!(scheduler.interval, Duration::from_secs(600));
        assert_eq!(scheduler.first_delay, Duration::from_secs(30));
        assert_eq!(scheduler.ip_cache_times, 10);
        assert_eq!(settings.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(settings_from(&[("DDNS_INTERVAL_SECS", "soon")]).is_err());
        assert!(settings_from(&[("DDNS_INTERVAL_SECS", "0")]).is_err());
        assert!(settings_from(&[("DDNS_IP_CACHE_TIMES", "-1")]).is_err());
        assert!(settings_from(&[("DDNS_LOG_LEVEL", "verbose")]).is_err());
    }

    #[test]
    fn test_registry_has_every_driver() {
        let transport = Arc::new(ReqwestTransport::new().unwrap());
        let registry = build_registry(transport).unwrap();
        for name in ["alidns", "dnspod", "cloudflare", "huaweicloud", "callback"] {
            assert!(registry.has_provider(name), "{} missing", name);
        }
    }
}
