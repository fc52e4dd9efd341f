use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use explorer_api::ConnectionProfile;
use mqtt_source::{MqttSourceConfig, spawn_mqtt_source};
use pipeline::spawn_ingest;
use profiles::{FileProfileRepository, ProfileRepository, create_default_profile, find_profile};
use topic_api_server::AppState;
use topic_engine::TopicEngine;

use crate::config::{ServeArgs, ServerConfig};
use crate::error::ServerError;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run(args: ServeArgs) -> Result<(), ServerError> {
    tracing::info!("topic-explorer starting");

    // --- Load config ---
    let mut config = ServerConfig::load(&args.config)?;
    if let Some(url) = args.broker {
        config.override_broker_url(url);
    }
    config.validate()?;
    tracing::info!(config = %args.config.display(), "loaded config");

    let repo: Arc<dyn ProfileRepository> = Arc::new(FileProfileRepository::new(&config.profiles_path));
    let profile = resolve_profile(&config, repo.as_ref()).await?;
    let source_config = MqttSourceConfig::from_profile(&profile, config.subscriptions.clone())?;
    tracing::info!(
        profile = %profile.name,
        host = %source_config.address.host,
        port = source_config.address.port,
        tls = source_config.address.tls,
        "using connection profile"
    );

    // --- CancellationToken for graceful shutdown ---
    let token = CancellationToken::new();

    // --- Engine + ingest ---
    let engine = Arc::new(TopicEngine::new(config.retention));
    let (tx, rx) = mpsc::channel(config.batch.buffer);
    let (ingest, ingest_task) = spawn_ingest(rx, engine, &config.batch, token.clone());

    // --- Broker source ---
    let (status, source_task) = spawn_mqtt_source(source_config, tx, token.clone());

    // --- API server (HTTP + WS) ---
    let state = AppState::new(ingest, repo, status).with_ws_buffer(config.ws_buffer);
    let api_port = config.api_port;
    let api_token = token.clone();
    let api_task = tokio::spawn(async move {
        if let Err(e) = topic_api_server::run(api_port, state, api_token.clone()).await {
            tracing::error!(error = %e, "api server error");
            api_token.cancel();
        }
    });

    tracing::info!("server ready");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => signal?,
        _ = token.cancelled() => {}
    }
    tracing::info!("shutting down...");
    token.cancel();

    // Source first, so ingest sees the channel close and flushes.
    for (task, handle) in [("source", source_task), ("ingest", ingest_task), ("api", api_task)] {
        drain(task, handle).await;
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn drain(task: &'static str, mut handle: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(task, error = %e, "task failed"),
        Err(_) => {
            tracing::warn!(task, "task did not stop in time, aborting");
            handle.abort();
        }
    }
}

/// Inline `[broker]` first, then the named profile, then the first stored
/// profile. An empty store gets the default profile.
pub(crate) async fn resolve_profile(
    config: &ServerConfig,
    repo: &dyn ProfileRepository,
) -> Result<ConnectionProfile, ServerError> {
    if let Some(broker) = &config.broker {
        return Ok(broker.to_profile());
    }
    if let Some(key) = &config.profile {
        return Ok(find_profile(repo, key).await?);
    }
    match repo.list().await?.into_iter().next() {
        Some(profile) => Ok(profile),
        None => Ok(create_default_profile(repo).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use profiles::{MemoryProfileRepository, ProfileError};

    #[tokio::test]
    async fn inline_broker_wins() {
        let repo = MemoryProfileRepository::new();
        let mut config = ServerConfig::parse("profile = \"missing\"").unwrap();
        config.override_broker_url("mqtt://inline:1884".into());

        let profile = resolve_profile(&config, &repo).await.unwrap();
        assert_eq!(profile.url, "mqtt://inline:1884");
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn named_profile_must_exist() {
        let repo = MemoryProfileRepository::new();
        let config = ServerConfig::parse("profile = \"lab\"").unwrap();
        let err = resolve_profile(&config, &repo).await.unwrap_err();
        assert!(matches!(err, ServerError::Profile(ProfileError::NotFound(_))));

        repo.create(ConnectionProfile::new("lab", "mqtt://lab")).await.unwrap();
        assert_eq!(resolve_profile(&config, &repo).await.unwrap().name, "lab");
    }

    #[tokio::test]
    async fn empty_store_gets_the_default_profile() {
        let repo = MemoryProfileRepository::new();
        let profile = resolve_profile(&ServerConfig::default(), &repo).await.unwrap();
        assert_eq!(profile.name, "Default");
        assert_eq!(repo.list().await.unwrap(), vec![profile.clone()]);

        // Second start reuses it.
        let again = resolve_profile(&ServerConfig::default(), &repo).await.unwrap();
        assert_eq!(again.id, profile.id);
    }
}
