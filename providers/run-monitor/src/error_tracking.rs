//! Error tracking for fatal run failures, enabled by `SENTRY_DSN`.

use crate::config::MonitorConfig;
use crate::monitoring::GlobalTags;
use anyhow::{Context, Result};
use sentry::integrations::anyhow::capture_anyhow;
use sentry::{ClientInitGuard, ClientOptions};
use tracing::{debug, error, info};

/// Client options tagged with the monitor's environment and release
pub fn error_tracking_options(config: &MonitorConfig) -> Result<Option<ClientOptions>> {
    let Some(dsn) = config.sentry_dsn.as_deref() else {
        return Ok(None);
    };
    let dsn = dsn
        .parse::<sentry::types::Dsn>()
        .context("SENTRY_DSN is not a valid DSN")?;

    Ok(Some(ClientOptions {
        dsn: Some(dsn),
        environment: Some(config.env.clone().into()),
        release: Some(config.release().into()),
        ..ClientOptions::default()
    }))
}

/// Bind the error tracking client; the guard flushes pending events on drop
pub fn init_error_tracking(config: &MonitorConfig) -> Result<Option<ClientInitGuard>> {
    match error_tracking_options(config)? {
        Some(options) => {
            let release = options.release.clone().unwrap_or_default();
            let guard = sentry::init(options);
            info!(env = %config.env, release = %release, "Error tracking enabled.");
            Ok(Some(guard))
        }
        None => {
            debug!("Error tracking is not enabled.");
            Ok(None)
        }
    }
}

/// Attach the run's global tags to every later event
pub fn set_run_tags(tags: &GlobalTags) {
    sentry::configure_scope(|scope| {
        scope.set_tag("app", &tags.app);
        scope.set_tag("command", &tags.command);
        scope.set_tag("version", &tags.version);
        scope.set_tag("number_of_cores", tags.number_of_cores);
        scope.set_tag("env", &tags.env);
        scope.set_tag("run_id", tags.run_id);
    });
}

/// Log a fatal failure and send it to error tracking
pub fn report_failure(err: &anyhow::Error) {
    error!(error = ?err, "Run failed");
    capture_anyhow(err);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dsn: Option<&str>) -> MonitorConfig {
        MonitorConfig {
            env: "staging".to_string(),
            service_name: "dbt-py".to_string(),
            app_version: Some("1.4.2".to_string()),
            sentry_dsn: dsn.map(str::to_string),
            ..MonitorConfig::default()
        }
    }

    #[test]
    fn test_disabled_without_dsn() {
        assert!(error_tracking_options(&config(None)).unwrap().is_none());
    }

    #[test]
    fn test_options_carry_environment_and_release() {
        let options = error_tracking_options(&config(Some("https://public@sentry.example.com/1")))
            .unwrap()
            .unwrap();
        assert_eq!(options.environment.as_deref(), Some("staging"));
        assert_eq!(options.release.as_deref(), Some("dbt-py@1.4.2"));
        assert_eq!(
            options.dsn.map(|dsn| dsn.host().to_string()),
            Some("sentry.example.com".to_string())
        );
    }

    #[test]
    fn test_invalid_dsn_is_rejected() {
        assert!(error_tracking_options(&config(Some("not a dsn"))).is_err());
    }

    #[test]
    fn test_failure_is_captured_with_run_tags() {
        let tags = GlobalTags::new(&config(None), "run");
        let events = sentry::test::with_captured_events(|| {
            set_run_tags(&tags);
            report_failure(&anyhow::anyhow!("Failed to start dbt"));
        });

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tags.get("command").map(String::as_str), Some("run"));
        assert_eq!(events[0].tags.get("env").map(String::as_str), Some("staging"));
    }
}
