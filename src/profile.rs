use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::api::{ClientError, LumeApi};
use crate::models::UserProfile;

#[derive(Debug, Clone)]
struct ProfileState {
    profile: Option<UserProfile>,
    loading: bool,
    error: Option<String>,
}

/// Holds the session's user profile. The server copy is authoritative: the
/// held value only ever changes to a body the server returned.
pub struct ProfileStore {
    api: LumeApi,
    state: RwLock<ProfileState>,
}

impl ProfileStore {
    pub fn new(api: LumeApi) -> Self {
        Self {
            api,
            state: RwLock::new(ProfileState {
                profile: None,
                loading: true,
                error: None,
            }),
        }
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.read(|s| s.profile.clone())
    }

    pub fn loading(&self) -> bool {
        self.read(|s| s.loading)
    }

    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    pub async fn fetch_profile(&self) -> Result<(), ClientError> {
        self.update(|s| s.loading = true);
        debug!(user_id = self.api.user_id(), "fetching profile");

        let result = self.api.get_profile().await;
        self.finish(result)
    }

    /// Submits `profile` as a full replacement.
    pub async fn update_profile(&self, profile: &UserProfile) -> Result<(), ClientError> {
        self.update(|s| s.loading = true);
        debug!(user_id = self.api.user_id(), "saving profile");

        let result = self.api.put_profile(profile).await;
        self.finish(result)
    }

    fn finish(&self, result: Result<UserProfile, ClientError>) -> Result<(), ClientError> {
        match result {
            Ok(profile) => {
                self.update(|s| {
                    s.profile = Some(profile);
                    s.error = None;
                    s.loading = false;
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "profile request failed");
                let message = err.to_string();
                self.update(|s| {
                    s.error = Some(message);
                    s.loading = false;
                });
                Err(err)
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&ProfileState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, f: impl FnOnce(&mut ProfileState)) {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::models::{RemotePreference, SkillCategories};
    use serde_json::json;
    use std::sync::Arc;

    pub(crate) fn sample_profile() -> UserProfile {
        UserProfile {
            user_id: "test123".to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            skills: SkillCategories {
                programming_languages: vec!["Rust".to_string()],
                ..Default::default()
            },
            experience_years: 3.5,
            preferred_roles: vec!["Backend Engineer".to_string()],
            preferred_locations: vec!["Remote".to_string()],
            weekly_application_goal: 10,
            preferred_industries: vec![],
            remote_preference: RemotePreference::Remote,
        }
    }

    fn store(transport: &Arc<RecordingTransport>) -> ProfileStore {
        ProfileStore::new(LumeApi::new(transport.clone(), "test123"))
    }

    #[test]
    fn test_initial_state() {
        let transport = RecordingTransport::new();
        let store = store(&transport);
        assert!(store.profile().is_none());
        assert!(store.loading());
        assert!(store.error().is_none());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_replaces_profile_and_clears_error() {
        let transport = RecordingTransport::new();
        transport.fail("GET /profiles/test123", "connection refused");
        transport.respond("GET /profiles/test123", 200, json!({"profile": sample_profile()}));
        let store = store(&transport);

        assert!(store.fetch_profile().await.is_err());
        assert!(store.profile().is_none());
        assert!(store.error().unwrap().contains("connection refused"));
        assert!(!store.loading());

        store.fetch_profile().await.unwrap();
        assert_eq!(store.profile(), Some(sample_profile()));
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_profile() {
        let transport = RecordingTransport::new();
        transport.respond("GET /profiles/test123", 200, json!({"profile": sample_profile()}));
        transport.respond("GET /profiles/test123", 500, json!({"detail": "boom"}));
        let store = store(&transport);

        store.fetch_profile().await.unwrap();
        assert!(store.fetch_profile().await.is_err());
        assert_eq!(store.profile(), Some(sample_profile()));
        assert_eq!(
            store.error().as_deref(),
            Some("Failed to fetch profile: server responded with status 500")
        );
    }

    #[tokio::test]
    async fn test_update_adopts_server_response_not_submission() {
        let transport = RecordingTransport::new();
        let submitted = UserProfile {
            name: "  ada  ".to_string(),
            ..sample_profile()
        };
        let normalized = UserProfile {
            name: "Ada".to_string(),
            ..sample_profile()
        };
        transport.respond("PUT /profiles/test123", 200, json!({"profile": normalized}));
        let store = store(&transport);

        store.update_profile(&submitted).await.unwrap();

        assert_eq!(store.profile(), Some(normalized));
        assert!(!store.loading());
        let requests = transport.requests_to("PUT /profiles/test123");
        assert_eq!(requests[0].body, Some(serde_json::to_value(&submitted).unwrap()));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_last_known_good() {
        let transport = RecordingTransport::new();
        transport.respond("GET /profiles/test123", 200, json!({"profile": sample_profile()}));
        transport.respond("PUT /profiles/test123", 422, json!({"detail": "invalid"}));
        let store = store(&transport);
        store.fetch_profile().await.unwrap();

        let edited = UserProfile {
            weekly_application_goal: 20,
            ..sample_profile()
        };
        assert!(store.update_profile(&edited).await.is_err());

        assert_eq!(store.profile(), Some(sample_profile()));
        assert!(store.error().is_some());
        assert!(!store.loading());
    }

    #[tokio::test]
    async fn test_last_resolved_response_wins() {
        let transport = RecordingTransport::new();
        let slow = UserProfile {
            name: "Slow".to_string(),
            ..sample_profile()
        };
        let fast = UserProfile {
            name: "Fast".to_string(),
            ..sample_profile()
        };
        transport.respond("GET /profiles/test123", 200, json!({"profile": slow}));
        transport.respond("GET /profiles/test123", 200, json!({"profile": fast}));
        let gate = transport.gate("GET /profiles/test123");
        let store = store(&transport);

        let first = store.fetch_profile();
        let second = async {
            store.fetch_profile().await.unwrap();
            assert_eq!(store.profile().unwrap().name, "Fast");
            gate.notify_one();
        };
        let (first, ()) = tokio::join!(first, second);
        first.unwrap();

        assert_eq!(store.profile().unwrap().name, "Slow");
    }

    #[tokio::test]
    async fn test_loading_while_update_in_flight() {
        let transport = RecordingTransport::new();
        transport.respond("GET /profiles/test123", 200, json!({"profile": sample_profile()}));
        transport.respond("PUT /profiles/test123", 200, json!({"profile": sample_profile()}));
        let store = store(&transport);
        store.fetch_profile().await.unwrap();
        assert!(!store.loading());
        let gate = transport.gate("PUT /profiles/test123");

        let profile = sample_profile();
        let update = store.update_profile(&profile);
        let observe = async {
            while transport.requests_to("PUT /profiles/test123").is_empty() {
                tokio::task::yield_now().await;
            }
            assert!(store.loading());
            gate.notify_one();
        };
        let (result, ()) = tokio::join!(update, observe);

        result.unwrap();
        assert!(!store.loading());
    }
}
