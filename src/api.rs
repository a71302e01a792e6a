use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{ApplicationStatus, Job, JobApplication, NewApplication, UserProfile};

// --- Transport seam ---

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never completed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError(err.to_string())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

// --- HTTP transport ---

pub struct HttpTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid API URL '{}': {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("API URL '{}' cannot be used as a base", base_url));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn url_for(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(&request.segments);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "received response");
        Ok(ApiResponse { status, body })
    }
}

// --- Typed client ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FetchProfile,
    UpdateProfile,
    FetchJobs,
    FetchApplications,
    ApplyToJob,
    UpdateApplication,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::FetchProfile => "fetch profile",
            Action::UpdateProfile => "update profile",
            Action::FetchJobs => "fetch jobs",
            Action::FetchApplications => "fetch applications",
            Action::ApplyToJob => "apply to job",
            Action::UpdateApplication => "update application",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to {action}: {source}")]
    Transport {
        action: Action,
        #[source]
        source: TransportError,
    },

    #[error("Failed to {action}: server responded with status {status}")]
    Status { action: Action, status: u16 },

    #[error("Failed to {action}: unexpected response ({source})")]
    Decode {
        action: Action,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to {action}: could not encode request ({source})")]
    Encode {
        action: Action,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

/// Filters for the job listing. Absent filters are never sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobSearch {
    pub query: Option<String>,
    pub location: Option<String>,
    pub remote: Option<bool>,
}

impl JobSearch {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(query) = &self.query {
            pairs.push(("query".to_string(), query.clone()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location".to_string(), location.clone()));
        }
        if let Some(remote) = self.remote {
            pairs.push(("remote".to_string(), remote.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    profile: UserProfile,
}

#[derive(Debug, Deserialize)]
struct JobsEnvelope {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
struct ApplicationsEnvelope {
    #[serde(default)]
    applications: Vec<JobApplication>,
}

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: ApplicationStatus,
}

/// Typed access to the Lume endpoints for one user.
#[derive(Clone)]
pub struct LumeApi {
    transport: Arc<dyn Transport>,
    user_id: String,
}

impl LumeApi {
    pub fn new(transport: Arc<dyn Transport>, user_id: impl Into<String>) -> Self {
        Self {
            transport,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn get_profile(&self) -> Result<UserProfile, ClientError> {
        let request = ApiRequest::new(Method::GET, &["profiles", &self.user_id]);
        let envelope: ProfileEnvelope = self.call(Action::FetchProfile, request).await?;
        Ok(envelope.profile)
    }

    pub async fn put_profile(&self, profile: &UserProfile) -> Result<UserProfile, ClientError> {
        let mut request = ApiRequest::new(Method::PUT, &["profiles", &self.user_id]);
        request.body = Some(to_body(Action::UpdateProfile, profile)?);
        let envelope: ProfileEnvelope = self.call(Action::UpdateProfile, request).await?;
        Ok(envelope.profile)
    }

    pub async fn list_jobs(&self, search: Option<&JobSearch>) -> Result<Vec<Job>, ClientError> {
        let mut request = ApiRequest::new(Method::GET, &["jobs", &self.user_id]);
        if let Some(search) = search {
            request.query = search.query_pairs();
        }
        let envelope: JobsEnvelope = self.call(Action::FetchJobs, request).await?;
        Ok(envelope.jobs)
    }

    pub async fn list_applications(&self) -> Result<Vec<JobApplication>, ClientError> {
        let request = ApiRequest::new(Method::GET, &["applications"]);
        let envelope: ApplicationsEnvelope = self.call(Action::FetchApplications, request).await?;
        Ok(envelope.applications)
    }

    pub async fn create_application(&self, application: &NewApplication) -> Result<(), ClientError> {
        let mut request = ApiRequest::new(Method::POST, &["applications"]);
        request.body = Some(to_body(Action::ApplyToJob, application)?);
        self.send_checked(Action::ApplyToJob, request).await?;
        Ok(())
    }

    pub async fn update_application_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Result<(), ClientError> {
        let mut request = ApiRequest::new(Method::PUT, &["applications", application_id]);
        request.body = Some(to_body(Action::UpdateApplication, &StatusUpdate { status })?);
        self.send_checked(Action::UpdateApplication, request).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, action: Action, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send_checked(action, request).await?;
        serde_json::from_str(&response.body).map_err(|source| ClientError::Decode { action, source })
    }

    async fn send_checked(&self, action: Action, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|source| ClientError::Transport { action, source })?;

        if !response.is_success() {
            return Err(ClientError::Status {
                action,
                status: response.status,
            });
        }
        Ok(response)
    }
}

fn to_body<T: Serialize>(action: Action, value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|source| ClientError::Encode { action, source })
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_without_filters_has_no_query() {
        let transport = HttpTransport::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
        let mut request = ApiRequest::new(Method::GET, &["jobs", "test123"]);
        request.query = JobSearch::default().query_pairs();

        let url = transport.url_for(&request);
        assert_eq!(url.as_str(), "http://localhost:8000/jobs/test123");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_url_keeps_base_prefix_and_encodes() {
        let transport = HttpTransport::new("https://api.example.com/v1/", Duration::from_secs(5)).unwrap();
        let mut request = ApiRequest::new(Method::GET, &["jobs", "user 1"]);
        request.query = JobSearch {
            query: Some("rust dev".to_string()),
            location: None,
            remote: Some(true),
        }
        .query_pairs();

        let url = transport.url_for(&request);
        assert_eq!(url.path(), "/v1/jobs/user%201");
        assert_eq!(url.query(), Some("query=rust+dev&remote=true"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpTransport::new("not a url", Duration::from_secs(5)).is_err());
        assert!(HttpTransport::new("mailto:someone@example.com", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_search_drops_absent_filters() {
        let search = JobSearch {
            query: None,
            location: Some("Berlin".to_string()),
            remote: Some(false),
        };
        assert_eq!(
            search.query_pairs(),
            vec![
                ("location".to_string(), "Berlin".to_string()),
                ("remote".to_string(), "false".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_non_success_status_is_failure() {
        let transport = RecordingTransport::new();
        transport.respond("GET /applications", 503, json!({"applications": []}));
        let api = LumeApi::new(transport, "test123");

        let err = api.list_applications().await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 503, .. }));
        assert_eq!(err.to_string(), "Failed to fetch applications: server responded with status 503");
    }

    #[tokio::test]
    async fn test_undecodable_body_is_failure() {
        let transport = RecordingTransport::new();
        transport.respond_raw("GET /profiles/test123", 200, "<html>oops</html>");
        let api = LumeApi::new(transport, "test123");

        let err = api.get_profile().await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { action: Action::FetchProfile, .. }));
    }

    #[tokio::test]
    async fn test_status_update_sends_status_only() {
        let transport = RecordingTransport::new();
        transport.respond("PUT /applications/app-1", 200, json!({}));
        let api = LumeApi::new(transport.clone(), "test123");

        api.update_application_status("app-1", ApplicationStatus::Offered)
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, Some(json!({"status": "offered"})));
    }

    #[test]
    fn test_unencodable_body_is_not_reported_as_bad_response() {
        // JSON object keys must be strings
        let body = std::collections::HashMap::from([((1u8, 2u8), "x")]);

        let err = to_body(Action::UpdateProfile, &body).unwrap_err();

        assert!(matches!(err, ClientError::Encode { action: Action::UpdateProfile, .. }));
        assert!(err.to_string().starts_with("Failed to update profile: could not encode request"));
    }
}
