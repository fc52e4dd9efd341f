use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tokio::sync::Mutex;

use explorer_api::ConnectionProfile;

use crate::ProfileError;
use crate::repo::{ProfileRepository, ProfileUpdate, validate};

// ════════════════════════════════════════════════════════════════
//  FileProfileRepository
// ════════════════════════════════════════════════════════════════

/// Profiles kept as one JSON array on disk.
///
/// Every mutation rewrites the whole file through a temp file and a
/// rename, so readers never see a half-written array. A missing file is
/// an empty repository.
pub struct FileProfileRepository {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileProfileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> ProfileError {
        ProfileError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<Vec<ConnectionProfile>, ProfileError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|source| ProfileError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, profiles: &[ConnectionProfile]) -> Result<(), ProfileError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let json = serde_json::to_vec_pretty(profiles).map_err(|source| ProfileError::Malformed {
            path: self.path.clone(),
            source,
        })?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut f = std::fs::File::create(&tmp).map_err(|e| self.io_err(e))?;
        f.write_all(&json).map_err(|e| self.io_err(e))?;
        f.sync_all().map_err(|e| self.io_err(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    /// Load, mutate, store under the lock.
    async fn modify<R>(
        &self,
        f: impl FnOnce(&mut Vec<ConnectionProfile>) -> Result<R, ProfileError>,
    ) -> Result<R, ProfileError> {
        let _guard = self.lock.lock().await;
        let mut profiles = self.load()?;
        let out = f(&mut profiles)?;
        self.store(&profiles)?;
        Ok(out)
    }
}

impl ProfileRepository for FileProfileRepository {
    fn list(&self) -> Pin<Box<dyn Future<Output = Result<Vec<ConnectionProfile>, ProfileError>> + Send + '_>> {
        Box::pin(async {
            let _guard = self.lock.lock().await;
            self.load()
        })
    }

    fn get(&self, id: &str) -> Pin<Box<dyn Future<Output = Result<ConnectionProfile, ProfileError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            let _guard = self.lock.lock().await;
            self.load()?
                .into_iter()
                .find(|p| p.id == id)
                .ok_or(ProfileError::NotFound(id))
        })
    }

    fn create(
        &self,
        profile: ConnectionProfile,
    ) -> Pin<Box<dyn Future<Output = Result<String, ProfileError>> + Send + '_>> {
        Box::pin(async move {
            validate(&profile)?;
            let id = self
                .modify(move |profiles| {
                    if profiles.iter().any(|p| p.id == profile.id) {
                        return Err(ProfileError::Duplicate(profile.id));
                    }
                    let id = profile.id.clone();
                    profiles.push(profile);
                    Ok(id)
                })
                .await?;
            tracing::debug!(%id, path = %self.path.display(), "profile created");
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
            self.modify(move |profiles| {
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
            .await
        })
    }

    fn delete(&self, id: &str) -> Pin<Box<dyn Future<Output = Result<(), ProfileError>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            self.modify(move |profiles| {
                let before = profiles.len();
                profiles.retain(|p| p.id != id);
                if profiles.len() == before {
                    return Err(ProfileError::NotFound(id));
                }
                Ok(())
            })
            .await
        })
    }
}
