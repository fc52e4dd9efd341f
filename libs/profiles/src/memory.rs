use std::future::Future;
use std::pin::Pin;

use tokio::sync::RwLock;

use explorer_api::ConnectionProfile;

use crate::ProfileError;
use crate::repo::{ProfileRepository, ProfileUpdate, validate};

/// Process-local profiles. Insertion order is kept.
#[derive(Default)]
pub struct MemoryProfileRepository {
    profiles: RwLock<Vec<ConnectionProfile>>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileRepository for MemoryProfileRepository {
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ConnectionProfile>, ProfileError>> + Send + '_>> {
        Box::pin(async { Ok(self.profiles.read().await.clone()) })
    }

    fn get(&self, id: &str) -> Pin<Box<dyn Future<Output = Result<ConnectionProfile, ProfileError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            self.profiles
                .read()
                .await
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(ProfileError::NotFound(id))
        })
    }

    fn create(
        &self,
        profile: ConnectionProfile,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProfileError>> + Send + '_>> {
        Box::pin(async move {
            validate(&profile)?;
            let mut profiles = self.profiles.write().await;
            if profiles.iter().any(|p| p.id == profile.id) {
                return Err(ProfileError::Duplicate(profile.id));
            }
            let id = profile.id.clone();
            profiles.push(profile);
            Ok(id)
        })
    }

    fn update(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Pin<Box<dyn Future<Output = Result<ConnectionProfile, ProfileError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut profiles = self.profiles.write().await;
            let slot = profiles
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| ProfileError::NotFound(id.clone()))?;
            let mut updated = slot.clone();
            update.apply(&mut updated);
            validate(&updated)?;
            *slot = updated.clone();
            Ok(updated)
        })
    }

    fn delete(&self, id: &str) -> Pin<Box<dyn Future<Output = Result<(), ProfileError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut profiles = self.profiles.write().await;
            let before = profiles.len();
            profiles.retain(|p| p.id != id);
            if profiles.len() == before {
                return Err(ProfileError::NotFound(id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{create_default_profile, find_profile};

    #[tokio::test]
    async fn crud_cycle() {
        let repo = MemoryProfileRepository::new();
        let id = repo
            .create(ConnectionProfile::new("lab", "mqtt://lab:1883"))
            .await
            .unwrap();

        let updated = repo
            .update(
                &id,
                ProfileUpdate {
                    username: Some(Some("ops".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username.as_deref(), Some("ops"));
        assert_eq!(repo.get(&id).await.unwrap().username.as_deref(), Some("ops"));

        let cleared = repo
            .update(
                &id,
                ProfileUpdate {
                    username: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.username, None);
        assert_eq!(repo.get(&id).await.unwrap().username, None);

        repo.delete(&id).await.unwrap();
        assert!(matches!(repo.get(&id).await, Err(ProfileError::NotFound(_))));
        assert!(matches!(repo.delete(&id).await, Err(ProfileError::NotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_ids_and_blank_fields_are_rejected() {
        let repo = MemoryProfileRepository::new();
        let profile = ConnectionProfile::new("a", "mqtt://a");
        repo.create(profile.clone()).await.unwrap();
        assert!(matches!(repo.create(profile.clone()).await, Err(ProfileError::Duplicate(_))));

        let err = repo
            .update(
                &profile.id,
                ProfileUpdate {
                    url: Some(" ".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(err, Err(ProfileError::Invalid(_))));
        assert_eq!(repo.get(&profile.id).await.unwrap().url, "mqtt://a");
    }

    #[tokio::test]
    async fn default_profile_is_findable_by_name() {
        let repo = MemoryProfileRepository::new();
        let created = create_default_profile(&repo).await.unwrap();

        let found = find_profile(&repo, "Default").await.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.url, "mqtt://localhost:1883");
        assert_eq!(found.keepalive, Some(60));
        assert!(found.client_id.unwrap().starts_with("mqttui_"));
    }
}
