use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use explorer_api::{ConnectionProfile, SubscriptionSpec};
use pipeline::BatchConfig;
use topic_engine::RetentionPolicy;

use crate::error::ServerError;

#[derive(Parser)]
#[command(name = "topic-explorer", about = "MQTT topic explorer backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to the broker and serve the explorer API
    Serve(ServeArgs),
    /// Manage saved connection profiles
    Profiles(ProfilesArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: PathBuf,

    /// Broker URL, overrides `[broker].url`
    #[arg(long)]
    pub broker: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ProfilesArgs {
    /// Path to the TOML config file (for `profiles_path`)
    #[arg(long, default_value = "config.toml", env = "CONFIG_PATH")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub action: ProfilesAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ProfilesAction {
    /// List stored profiles
    List,
    /// Store a new profile
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Seconds
        #[arg(long)]
        keepalive: Option<u64>,
        #[arg(long)]
        clean_start: Option<bool>,
    },
    /// Remove a profile by id or name
    Remove { key: String },
}

// ---- TOML Config ----

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_profiles_path")]
    pub profiles_path: PathBuf,
    /// Stored profile (name or id) to connect with.
    #[serde(default)]
    pub profile: Option<String>,
    /// Per-WS-client notification buffer.
    #[serde(default = "default_ws_buffer")]
    pub ws_buffer: usize,
    /// Inline connection settings, preferred over `profile`.
    #[serde(default)]
    pub broker: Option<BrokerConfig>,
    #[serde(default = "default_subscriptions")]
    pub subscriptions: Vec<SubscriptionSpec>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub keepalive: Option<u64>,
    #[serde(default)]
    pub clean_start: Option<bool>,
    #[serde(default)]
    pub session_expiry: Option<u32>,
}

impl BrokerConfig {
    pub fn to_profile(&self) -> ConnectionProfile {
        let mut profile = ConnectionProfile::new("config", &self.url);
        profile.client_id = self.client_id.clone();
        profile.username = self.username.clone();
        profile.password = self.password.clone();
        profile.keepalive = self.keepalive;
        profile.clean_start = self.clean_start;
        profile.session_expiry = self.session_expiry;
        profile
    }
}

fn default_api_port() -> u16 {
    9300
}
fn default_profiles_path() -> PathBuf {
    PathBuf::from("profiles.json")
}
fn default_ws_buffer() -> usize {
    256
}
fn default_subscriptions() -> Vec<SubscriptionSpec> {
    vec![SubscriptionSpec::default()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            profiles_path: default_profiles_path(),
            profile: None,
            ws_buffer: default_ws_buffer(),
            broker: None,
            subscriptions: default_subscriptions(),
            batch: BatchConfig::default(),
            retention: RetentionPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Read and parse `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(config = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ServerError::Config {
                    context: "read",
                    detail: format!("'{}': {e}", path.display()),
                });
            }
        };
        Self::parse(&content).map_err(|e| match e {
            ServerError::Config { context, detail } => ServerError::Config {
                context,
                detail: format!("'{}': {detail}", path.display()),
            },
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ServerError> {
        toml::from_str(content).map_err(|e| ServerError::Config {
            context: "parse",
            detail: e.to_string(),
        })
    }

    /// `--broker` wins over the file; without a `[broker]` table it
    /// creates one.
    pub fn override_broker_url(&mut self, url: String) {
        match &mut self.broker {
            Some(broker) => broker.url = url,
            None => {
                self.broker = Some(BrokerConfig {
                    url,
                    client_id: None,
                    username: None,
                    password: None,
                    keepalive: None,
                    clean_start: None,
                    session_expiry: None,
                })
            }
        }
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        let invalid = |detail: String| ServerError::Config {
            context: "validate",
            detail,
        };

        if self.retention.max_messages == 0 {
            return Err(invalid("retention.max_messages must be >= 1".into()));
        }
        if self.ws_buffer == 0 {
            return Err(invalid("ws_buffer must be > 0".into()));
        }
        self.batch
            .validate()
            .map_err(|e| invalid(format!("batch: {e}")))?;
        if let Some(broker) = &self.broker {
            mqtt_source::parse_broker_url(&broker.url).map_err(|e| invalid(format!("broker: {e}")))?;
        }
        if self.subscriptions.iter().any(|s| s.filter.is_empty()) {
            return Err(invalid("subscription filter must not be empty".into()));
        }
        Ok(())
    }
}
