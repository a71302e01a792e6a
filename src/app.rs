use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::api::{JobSearch, LumeApi, Transport};
use crate::db::Database;
use crate::jobs::JobStore;
use crate::metrics::Dashboard;
use crate::profile::ProfileStore;
use crate::theme::{ThemeMode, ThemeStore};

/// One instance per running program, built in `main` and handed to every view.
pub struct AppContext<'a> {
    pub profile: Arc<ProfileStore>,
    pub jobs: Arc<JobStore>,
    pub theme: ThemeStore<'a>,
}

impl<'a> AppContext<'a> {
    pub fn new(
        transport: Arc<dyn Transport>,
        user_id: &str,
        db: &'a Database,
        ambient: Option<ThemeMode>,
    ) -> Result<Self> {
        let api = LumeApi::new(transport, user_id);
        Ok(Self {
            profile: Arc::new(ProfileStore::new(api.clone())),
            jobs: Arc::new(JobStore::new(api)),
            theme: ThemeStore::load(db, ambient)?,
        })
    }

    /// Runs the startup fetches concurrently. Failures stay in the stores.
    /// `search` filters the initial job listing, so a search command needs no
    /// second request.
    pub async fn initialize(&self, search: Option<&JobSearch>) {
        let (profile, jobs, applications) = tokio::join!(
            self.profile.fetch_profile(),
            self.jobs.fetch_jobs(search),
            self.jobs.fetch_applications(),
        );
        info!(
            profile_ok = profile.is_ok(),
            jobs_ok = jobs.is_ok(),
            applications_ok = applications.is_ok(),
            "initial load finished"
        );
    }

    pub fn dashboard(&self) -> Dashboard {
        let profile = self.profile.profile();
        Dashboard::compute(&self.jobs.applications(), profile.as_ref(), &chrono::Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::jobs::tests::{application, job};
    use crate::profile::tests::sample_profile;
    use serde_json::json;

    #[tokio::test]
    async fn test_initialize_fetches_everything_once() {
        let transport = RecordingTransport::new();
        transport.respond("GET /profiles/test123", 200, json!({"profile": sample_profile()}));
        transport.respond("GET /jobs/test123", 200, json!({"jobs": [job("j1", "Rust Engineer", "Acme")]}));
        transport.respond(
            "GET /applications",
            200,
            json!({"applications": [application("a1", "j1", "applied")]}),
        );
        let db = Database::open_in_memory().unwrap();
        let ctx = AppContext::new(transport.clone(), "test123", &db, None).unwrap();

        assert!(ctx.profile.loading());
        ctx.initialize(None).await;

        assert_eq!(transport.requests().len(), 3);
        assert!(!ctx.profile.loading());
        assert_eq!(ctx.profile.profile(), Some(sample_profile()));
        assert_eq!(ctx.jobs.jobs().len(), 1);
        assert!(ctx.jobs.is_applied("j1"));
        assert_eq!(ctx.dashboard().stats.total, 1);
    }

    #[tokio::test]
    async fn test_errors_stay_in_their_store() {
        let transport = RecordingTransport::new();
        transport.respond("GET /profiles/test123", 500, json!({}));
        transport.respond("GET /jobs/test123", 200, json!({"jobs": []}));
        transport.respond("GET /applications", 200, json!({"applications": []}));
        let db = Database::open_in_memory().unwrap();
        let ctx = AppContext::new(transport, "test123", &db, None).unwrap();

        ctx.initialize(None).await;

        assert!(ctx.profile.error().is_some());
        assert!(ctx.profile.profile().is_none());
        assert!(ctx.jobs.jobs_error().is_none());
        assert!(ctx.jobs.applications_error().is_none());
        assert_eq!(ctx.dashboard().goal, crate::metrics::DEFAULT_WEEKLY_GOAL);
    }

    #[tokio::test]
    async fn test_failed_applications_leave_jobs_usable() {
        let transport = RecordingTransport::new();
        transport.respond("GET /profiles/test123", 200, json!({"profile": sample_profile()}));
        transport.respond("GET /jobs/test123", 200, json!({"jobs": [job("j1", "Rust Engineer", "Acme")]}));
        transport.respond("GET /applications", 500, json!({}));
        let db = Database::open_in_memory().unwrap();
        let ctx = AppContext::new(transport, "test123", &db, None).unwrap();

        ctx.initialize(None).await;

        assert_eq!(ctx.jobs.jobs().len(), 1);
        assert!(ctx.jobs.jobs_error().is_none());
        assert!(ctx.jobs.applications_error().is_some());
    }

    #[tokio::test]
    async fn test_initial_search_sends_one_job_request() {
        let transport = RecordingTransport::new();
        transport.respond("GET /jobs/test123", 200, json!({"jobs": [job("j1", "Rust Engineer", "Acme")]}));
        let db = Database::open_in_memory().unwrap();
        let ctx = AppContext::new(transport.clone(), "test123", &db, None).unwrap();
        let search = JobSearch {
            query: Some("rust".to_string()),
            ..Default::default()
        };

        ctx.initialize(Some(&search)).await;

        let requests = transport.requests_to("GET /jobs/test123");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, vec![("query".to_string(), "rust".to_string())]);
        assert_eq!(ctx.jobs.jobs().len(), 1);
    }
}
