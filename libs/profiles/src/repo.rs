use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Deserializer};

use explorer_api::{ConnectionProfile, generate_client_id};

use crate::ProfileError;

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const DEFAULT_BROKER_URL: &str = "mqtt://localhost:1883";
const DEFAULT_KEEPALIVE_SECS: u64 = 60;

// ═══════════════════════════════════════════════════════════════
//  ProfileRepository
// ═══════════════════════════════════════════════════════════════

/// CRUD over stored connection profiles, keyed by profile id.
pub trait ProfileRepository: Send + Sync {
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ConnectionProfile>, ProfileError>> + Send + '_>>;

    fn get(&self, id: &str) -> Pin<Box<dyn Future<Output = Result<ConnectionProfile, ProfileError>> + Send + '_>>;

    /// Store a new profile. Returns its id.
    fn create(
        &self,
        profile: ConnectionProfile,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProfileError>> + Send + '_>>;

    /// Apply a partial update. Returns the updated profile.
    fn update(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<ConnectionProfile, ProfileError>> + Send + '_>>;

    fn delete(&self, id: &str) -> Pin<Box<dyn Future<Output = Result<(), ProfileError>> + Send + '_>>;
}

/// Look a profile up by id, falling back to an exact name match.
pub async fn find_profile(
    repo: &dyn ProfileRepository,
    key: &str,
) -> Result<ConnectionProfile, ProfileError> {
    let profiles = repo.list().await?;
    profiles
        .iter()
        .find(|p| p.id == key)
        .or_else(|| profiles.iter().find(|p| p.name == key))
        .cloned()
        .ok_or_else(|| ProfileError::NotFound(key.to_string()))
}

/// Create and store the stock local-broker profile.
pub async fn create_default_profile(
    repo: &dyn ProfileRepository,
) -> Result<ConnectionProfile, ProfileError> {
    let mut profile = ConnectionProfile::new(DEFAULT_PROFILE_NAME, DEFAULT_BROKER_URL);
    profile.client_id = Some(generate_client_id());
    profile.keepalive = Some(DEFAULT_KEEPALIVE_SECS);
    profile.clean_start = Some(true);
    repo.create(profile.clone()).await?;
    tracing::info!(id = %profile.id, "default profile created");
    Ok(profile)
}

pub(crate) fn validate(profile: &ConnectionProfile) -> Result<(), ProfileError> {
    if profile.id.trim().is_empty() {
        return Err(ProfileError::Invalid("id is empty".into()));
    }
    if profile.name.trim().is_empty() {
        return Err(ProfileError::Invalid("name is empty".into()));
    }
    if profile.url.trim().is_empty() {
        return Err(ProfileError::Invalid("url is empty".into()));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════
//  ProfileUpdate
// ═══════════════════════════════════════════════════════════════

/// Partial profile update. Absent fields are left as they are; an explicit
/// `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub client_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub username: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub password: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub keepalive: Option<Option<u64>>,
    #[serde(default, deserialize_with = "present")]
    pub clean_start: Option<Option<bool>>,
    #[serde(default, deserialize_with = "present")]
    pub session_expiry: Option<Option<u32>>,
}

/// A key that is present, `null` included, becomes `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProfileUpdate {
    pub fn apply(self, profile: &mut ConnectionProfile) {
        if let Some(v) = self.name {
            profile.name = v;
        }
        if let Some(v) = self.url {
            profile.url = v;
        }
        if let Some(v) = self.client_id {
            profile.client_id = v;
        }
        if let Some(v) = self.username {
            profile.username = v;
        }
        if let Some(v) = self.password {
            profile.password = v;
        }
        if let Some(v) = self.keepalive {
            profile.keepalive = v;
        }
        if let Some(v) = self.clean_start {
            profile.clean_start = v;
        }
        if let Some(v) = self.session_expiry {
            profile.session_expiry = v;
        }
    }
}
