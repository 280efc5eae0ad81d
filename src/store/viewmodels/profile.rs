use crate::core::{Result, StoreError};
use crate::messages::MessageProvider;
use crate::optimistic::{ErrorChannel, OptimisticController};
use crate::session::SessionStore;
use crate::store::models::Profile;
use crate::store::repositories::ProfileRepository;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    /// `None` until the user creates a profile.
    pub profile: Option<Profile>,
    pub is_loading: bool,
    pub is_uploading: bool,
}

pub struct ProfileViewModel {
    repo: ProfileRepository,
    sessions: Arc<SessionStore>,
    controller: OptimisticController<ProfileState>,
}

impl ProfileViewModel {
    pub fn new(repo: ProfileRepository, sessions: Arc<SessionStore>, messages: Arc<dyn MessageProvider>) -> Self {
        Self {
            repo,
            sessions,
            controller: OptimisticController::new(ProfileState::default(), messages),
        }
    }

    pub fn state(&self) -> ProfileState {
        self.controller.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.controller.subscribe()
    }

    pub fn errors(&self) -> &ErrorChannel {
        self.controller.errors()
    }

    pub async fn load(&self) -> Result<()> {
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        self.controller.update(|state| state.is_loading = true);
        let result = self
            .controller
            .load(
                async { self.repo.get(user_id).await.map_err(StoreError::from) },
                |state, profile| state.profile = profile,
            )
            .await;
        self.controller.update(|state| state.is_loading = false);
        result
    }

    pub async fn save(&self, full_name: &str, phone: Option<&str>) -> Result<()> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(self.controller.fail(StoreError::Validation(
                "name cannot be empty".to_string(),
            )));
        }
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;

        let avatar_url = self
            .controller
            .state()
            .profile
            .as_ref()
            .and_then(|p| p.avatar_url.clone());
        let profile = Profile {
            id: user_id.to_string(),
            full_name: full_name.to_string(),
            phone: phone.map(str::to_string).filter(|p| !p.is_empty()),
            avatar_url,
        };
        self.controller
            .load(
                self.repo.upsert(&profile),
                |state, saved| state.profile = Some(saved),
            )
            .await
    }

    pub async fn upload_avatar(&self, bytes: Vec<u8>) -> Result<()> {
        let user_id = self.sessions.user_id();
        let user_id = self.controller.require_user(user_id.as_deref())?;
        self.controller.update(|state| state.is_uploading = true);
        let result = self
            .controller
            .load(self.repo.upload_avatar(user_id, bytes), |state, url| {
                if let Some(profile) = state.profile.as_mut() {
                    profile.avatar_url = Some(url);
                }
            })
            .await;
        self.controller.update(|state| state.is_uploading = false);
        result
    }
}
