use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::api::{ClientError, JobSearch, LumeApi};
use crate::models::{ApplicationStatus, Job, JobApplication, NewApplication};

#[derive(Debug, Clone, Default)]
struct JobState {
    jobs: Vec<Job>,
    applications: Vec<JobApplication>,
    loading: bool,
    jobs_error: Option<String>,
    applications_error: Option<String>,
}

/// Job listings and the user's applications. The two collections are fetched
/// and fail independently; neither is ever cleared by a failed request.
pub struct JobStore {
    api: LumeApi,
    state: RwLock<JobState>,
}

impl JobStore {
    pub fn new(api: LumeApi) -> Self {
        Self {
            api,
            state: RwLock::new(JobState::default()),
        }
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.read(|s| s.jobs.clone())
    }

    pub fn applications(&self) -> Vec<JobApplication> {
        self.read(|s| s.applications.clone())
    }

    pub fn loading(&self) -> bool {
        self.read(|s| s.loading)
    }

    /// Last failure of a job listing fetch.
    pub fn jobs_error(&self) -> Option<String> {
        self.read(|s| s.jobs_error.clone())
    }

    /// Last failure of an applications fetch, apply or status change.
    pub fn applications_error(&self) -> Option<String> {
        self.read(|s| s.applications_error.clone())
    }

    /// Whichever collection has an error, jobs first.
    pub fn error(&self) -> Option<String> {
        self.read(|s| s.jobs_error.clone().or_else(|| s.applications_error.clone()))
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.read(|s| s.jobs.iter().find(|j| j.job_id == job_id).cloned())
    }

    pub fn is_applied(&self, job_id: &str) -> bool {
        self.read(|s| s.applications.iter().any(|a| a.job_id == job_id))
    }

    /// Joins an application to its listing; `None` when the job is no longer listed.
    pub fn job_for(&self, application: &JobApplication) -> Option<Job> {
        self.job(&application.job_id)
    }

    pub async fn fetch_jobs(&self, search: Option<&JobSearch>) -> Result<(), ClientError> {
        self.update(|s| s.loading = true);
        debug!(?search, "fetching jobs");

        let result = self.api.list_jobs(search).await;
        match result {
            Ok(jobs) => {
                debug!(count = jobs.len(), "jobs loaded");
                self.update(|s| {
                    s.jobs = jobs;
                    s.jobs_error = None;
                    s.loading = false;
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "request failed");
                let message = err.to_string();
                self.update(|s| {
                    s.jobs_error = Some(message);
                    s.loading = false;
                });
                Err(err)
            }
        }
    }

    pub async fn fetch_applications(&self) -> Result<(), ClientError> {
        debug!("fetching applications");
        match self.api.list_applications().await {
            Ok(applications) => {
                debug!(count = applications.len(), "applications loaded");
                self.update(|s| {
                    s.applications = applications;
                    s.applications_error = None;
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "request failed");
                let message = err.to_string();
                self.update(|s| s.applications_error = Some(message));
                Err(err)
            }
        }
    }

    pub async fn apply_to_job(&self, job_id: &str) -> Result<(), ClientError> {
        self.update(|s| s.loading = true);

        let Some(job) = self.job(job_id) else {
            let err = ClientError::JobNotFound(job_id.to_string());
            self.fail(&err);
            return Err(err);
        };

        let application = NewApplication::snapshot(&job, self.api.user_id());
        debug!(job_id, company = %application.company, "applying to job");
        if let Err(err) = self.api.create_application(&application).await {
            self.fail(&err);
            return Err(err);
        }

        self.refresh_after_mutation().await
    }

    pub async fn update_application(
        &self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Result<(), ClientError> {
        self.update(|s| s.loading = true);
        debug!(application_id, %status, "updating application");

        if let Err(err) = self.api.update_application_status(application_id, status).await {
            self.fail(&err);
            return Err(err);
        }

        self.refresh_after_mutation().await
    }

    async fn refresh_after_mutation(&self) -> Result<(), ClientError> {
        let refreshed = self.fetch_applications().await;
        self.update(|s| s.loading = false);
        refreshed
    }

    fn fail(&self, err: &ClientError) {
        warn!(error = %err, "request failed");
        let message = err.to_string();
        self.update(|s| {
            s.applications_error = Some(message);
            s.loading = false;
        });
    }

    fn read<T>(&self, f: impl FnOnce(&JobState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, f: impl FnOnce(&mut JobState)) {
        f(&mut self.state.write().unwrap_or_else(PoisonError::into_inner));
    }
}
