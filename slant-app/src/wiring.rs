//! Builds the runtime pieces from a loaded [`SlantConfig`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use slant_analysis::{
    CredentialProvider, HttpAnalysisApi, NoCredentials, Orchestrator, OrchestratorConfig,
    StaticCredentials,
};
use slant_common::observability::LogConfig;
use slant_config::{LoggingConfig, SlantConfig};
use slant_store::{KvStore, MemoryStore, SqliteStore};

pub fn log_config(logging: &LoggingConfig) -> LogConfig {
    LogConfig {
        app_name: "slant",
        log_dir: logging.dir.clone(),
        emit_stderr: logging.emit_stderr,
        format: logging.format,
        default_filter: logging.filter.clone(),
    }
}

pub fn orchestrator_config(cfg: &SlantConfig) -> OrchestratorConfig {
    OrchestratorConfig {
        max_poll_attempts: cfg.polling.max_attempts,
        poll_interval: Duration::from_millis(cfg.polling.interval_ms),
        max_restarts: cfg.polling.max_restarts,
        detailed_requires_premium: cfg.analysis.detailed_requires_premium,
        support_contact: cfg.analysis.support_contact.clone(),
    }
}

pub fn credentials(cfg: &SlantConfig) -> Arc<dyn CredentialProvider> {
    let service = &cfg.service;
    if service.auth_token.is_none() && !service.premium {
        return Arc::new(NoCredentials);
    }
    Arc::new(StaticCredentials::new(
        service.auth_token.clone(),
        service.premium,
    ))
}

pub async fn open_store(cfg: &SlantConfig, ephemeral: bool) -> Result<Arc<dyn KvStore>> {
    if ephemeral {
        tracing::info!("store.memory.open");
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = SqliteStore::connect(&cfg.store.database_url)
        .await
        .with_context(|| format!("failed to open store at {}", cfg.store.database_url))?;
    Ok(Arc::new(store))
}

pub async fn build_orchestrator(cfg: &SlantConfig, ephemeral: bool) -> Result<Orchestrator> {
    let creds = credentials(cfg);
    let api = HttpAnalysisApi::new(
        &cfg.service.base_url,
        Duration::from_secs(cfg.service.timeout_secs),
        cfg.service.retries,
        creds.clone(),
    )
    .with_context(|| format!("invalid service url {}", cfg.service.base_url))?;
    let store = open_store(cfg, ephemeral).await?;
    Ok(Orchestrator::new(
        Arc::new(api),
        store,
        creds,
        orchestrator_config(cfg),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slant_common::observability::LogFormat;
    use slant_config::SlantConfigLoader;

    fn config(yaml: &str) -> SlantConfig {
        SlantConfigLoader::new().with_yaml_str(yaml).load().unwrap()
    }

    #[test]
    fn logging_section_maps_to_log_config() {
        let cfg = config("logging:\n  format: json\n  filter: debug\n  emit_stderr: true\n");
        let log = log_config(&cfg.logging);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.default_filter, "debug");
        assert!(log.emit_stderr);
    }

    #[test]
    fn polling_section_maps_to_orchestrator() {
        let cfg = config("polling:\n  interval_ms: 250\n  max_attempts: 2\n");
        let oc = orchestrator_config(&cfg);
        assert_eq!(oc.poll_interval, Duration::from_millis(250));
        assert_eq!(oc.max_poll_attempts, 2);
        assert_eq!(oc.max_restarts, 3);
    }

    #[tokio::test]
    async fn premium_flag_reaches_credentials() {
        let cfg = config("service:\n  premium: true\n");
        let creds = credentials(&cfg);
        assert!(creds.is_premium().await);
        assert_eq!(creds.bearer_token().await, None);
    }

    #[tokio::test]
    async fn file_store_is_created_on_demand() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("state.db").display());
        let cfg = config(&format!("store:\n  database_url: \"{url}\"\n"));
        let store = open_store(&cfg, false).await.unwrap();
        store.set("k", serde_json::json!(1)).await.unwrap();
        assert!(dir.path().join("state.db").exists());
    }
}
