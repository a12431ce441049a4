use std::sync::Arc;

use crate::api::UserIdentity;
use crate::utils::storage::{keys, KeyValueStore, MemoryStorage, StorageError};

/// Explicit session context handed to every component that needs the
/// current user or token. Nothing is cached in memory: each read goes back
/// to storage so a logout elsewhere is observed immediately.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn KeyValueStore>,
}

impl Session {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn token(&self) -> Result<Option<String>, StorageError> {
        Ok(self
            .store
            .get_item(keys::TOKEN)
            .await?
            .filter(|token| !token.is_empty()))
    }

    pub async fn cached_user(&self) -> Result<Option<UserIdentity>, StorageError> {
        let Some(raw) = self.store.get_item(keys::USER).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: keys::USER.to_string(),
                source,
            })
    }

    pub async fn persist_login(&self, token: &str, user: &UserIdentity) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user).map_err(|source| StorageError::Corrupt {
            key: keys::USER.to_string(),
            source,
        })?;
        self.store.set_item(keys::TOKEN, token).await?;
        self.store.set_item(keys::USER, &user_json).await?;
        if let Some(image) = &user.profile_image {
            self.store.set_item(keys::PROFILE_IMAGE, image).await?;
        }
        Ok(())
    }

    pub async fn cached_profile_image(&self) -> Result<Option<String>, StorageError> {
        if let Some(image) = self.store.get_item(keys::PROFILE_IMAGE).await? {
            return Ok(Some(image));
        }
        Ok(self
            .cached_user()
            .await
            .ok()
            .flatten()
            .and_then(|user| user.profile_image))
    }

    /// Records a new avatar both standalone and inside the cached user.
    pub async fn update_profile_image(&self, image: &str) -> Result<(), StorageError> {
        self.store.set_item(keys::PROFILE_IMAGE, image).await?;
        if let Some(mut user) = self.cached_user().await? {
            user.profile_image = Some(image.to_string());
            let user_json =
                serde_json::to_string(&user).map_err(|source| StorageError::Corrupt {
                    key: keys::USER.to_string(),
                    source,
                })?;
            self.store.set_item(keys::USER, &user_json).await?;
        }
        Ok(())
    }

    /// Drops token, identity and avatar. Device info and install id stay.
    pub async fn invalidate(&self) -> Result<(), StorageError> {
        self.store
            .multi_remove(&[keys::TOKEN, keys::USER, keys::PROFILE_IMAGE])
            .await
    }
}
