use crate::remote::{Backend, RemoteError, RowFilter, RowQuery, decode_row, decode_rows, single_row};
use crate::resilience::{OperationResult, ResilientCaller};
use crate::session::ImageNumberPool;
use crate::store::models::{AVATAR_BUCKET, PROFILES, Profile};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProfileRepository {
    backend: Arc<dyn Backend>,
    caller: ResilientCaller,
    images: Arc<ImageNumberPool>,
}

impl ProfileRepository {
    pub fn new(backend: Arc<dyn Backend>, caller: ResilientCaller, images: Arc<ImageNumberPool>) -> Self {
        Self {
            backend,
            caller,
            images,
        }
    }

    /// The user's profile; `None` when it has not been created yet.
    pub async fn get(&self, user_id: &str) -> OperationResult<Option<Profile>> {
        let query = RowQuery::filtered(RowFilter::new().eq("id", user_id)).limit(1);
        let backend = self.backend.as_ref();
        self.caller
            .call_optional("profiles.get", || async {
                single_row(backend.select(PROFILES, &query).await?, PROFILES)
            })
            .await
    }

    /// Updates the profile row, inserting it when absent.
    pub async fn upsert(&self, profile: &Profile) -> crate::core::Result<Profile> {
        let filter = RowFilter::new().eq("id", profile.id.as_str());
        let row = serde_json::to_value(profile)?;
        let backend = self.backend.as_ref();

        let updated: Vec<Profile> = self
            .caller
            .call("profiles.update", || {
                let row = row.clone();
                let filter = &filter;
                async move { decode_rows(backend.update(PROFILES, filter, row).await?) }
            })
            .await?;
        if let Some(profile) = updated.into_iter().next() {
            return Ok(profile);
        }

        let inserted = self
            .caller
            .call("profiles.insert", || {
                let row = row.clone();
                async move { decode_row(backend.insert(PROFILES, row).await?) }
            })
            .await?;
        Ok(inserted)
    }

    /// Uploads an avatar under a freshly allocated image number and returns
    /// its public URL.
    ///
    /// The profile row must exist. The new number is released if any step
    /// fails; on success the number of the replaced avatar is released.
    pub async fn upload_avatar(&self, user_id: &str, bytes: Vec<u8>) -> crate::core::Result<String> {
        let query = RowQuery::filtered(RowFilter::new().eq("id", user_id)).limit(1);
        let backend = self.backend.as_ref();
        let current: Profile = self
            .caller
            .call("profiles.avatar_owner", || async {
                single_row(backend.select(PROFILES, &query).await?, PROFILES)
            })
            .await?;

        let number = self.images.acquire()?;
        let path = format!("{user_id}/{number}.jpg");
        match self.store_avatar(user_id, &path, bytes).await {
            Ok(url) => {
                let previous = current
                    .avatar_url
                    .as_deref()
                    .and_then(|url| image_number(url, user_id))
                    .filter(|previous| *previous != number);
                if let Some(previous) = previous {
                    self.images.release(previous);
                }
                log::debug!("avatar stored: user='{}' number={}", user_id, number);
                Ok(url)
            }
            Err(err) => {
                self.images.release(number);
                Err(err.into())
            }
        }
    }

    async fn store_avatar(&self, user_id: &str, path: &str, bytes: Vec<u8>) -> OperationResult<String> {
        let backend = self.backend.as_ref();
        let url = self
            .caller
            .call("profiles.upload_avatar", || {
                let bytes = bytes.clone();
                async move { backend.upload(AVATAR_BUCKET, path, bytes, "image/jpeg").await }
            })
            .await?;

        let patch = json!({ "avatar_url": url });
        let filter = RowFilter::new().eq("id", user_id);
        self.caller
            .call("profiles.set_avatar", || {
                let patch = patch.clone();
                let filter = &filter;
                async move {
                    let updated = backend.update(PROFILES, filter, patch).await?;
                    if updated.is_empty() {
                        return Err(RemoteError::NotFound(format!("profile '{user_id}'")));
                    }
                    Ok(())
                }
            })
            .await?;
        Ok(url)
    }
}

/// The image number encoded in an avatar URL ending in `{user_id}/{n}.jpg`.
fn image_number(url: &str, user_id: &str) -> Option<u32> {
    let mut segments = url.rsplit('/');
    let file = segments.next()?;
    if segments.next()? != user_id {
        return None;
    }
    file.strip_suffix(".jpg")?.parse().ok()
}
