//! reqwest implementations of the service traits.

use std::time::Duration;

use async_trait::async_trait;
use evacsim_core::{JobStatusResponse, JobTicket, SimulationRequest};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{
    FloorPlanPage, FloorPlanRecord, FloorPlanRepository, FloorPlanSummary, FloorPlanUpdate,
    ImageGridService, ImageUpload, ListQuery, NewFloorPlan, ProcessImageResponse, ServiceError,
    SimulationService,
};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_client(timeout: Duration) -> Result<Client, ServiceError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn join(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

async fn check(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::from_status(status.as_u16(), &body))
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ServiceError> {
    let response = check(request.send().await?).await?;
    Ok(response.json().await?)
}

/// Evacuation engine over HTTP.
#[derive(Clone, Debug)]
pub struct HttpSimulationService {
    client: Client,
    base_url: String,
}

impl HttpSimulationService {
    /// Creates a client for the engine at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SimulationService for HttpSimulationService {
    async fn submit(&self, request: &SimulationRequest) -> Result<JobTicket, ServiceError> {
        let url = join(&self.base_url, "run-simulation");
        debug!(%url, agents = request.agent_positions.len(), "submitting simulation");
        send_json(self.client.post(url).json(request)).await
    }

    async fn status(&self, job_id: &str) -> Result<JobStatusResponse, ServiceError> {
        let url = join(&self.base_url, &format!("status/{job_id}"));
        send_json(self.client.get(url)).await
    }
}

/// Image-to-grid service over HTTP.
#[derive(Clone, Debug)]
pub struct HttpImageGridService {
    client: Client,
    base_url: String,
}

impl HttpImageGridService {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ImageGridService for HttpImageGridService {
    async fn process_image(
        &self,
        upload: &ImageUpload,
    ) -> Result<ProcessImageResponse, ServiceError> {
        let part = Part::bytes(upload.bytes().to_vec())
            .file_name(upload.file_name().to_owned())
            .mime_str(upload.kind().mime())?;
        let url = join(&self.base_url, "process-image");
        debug!(%url, bytes = upload.bytes().len(), "uploading floor plan image");
        send_json(self.client.post(url).multipart(Form::new().part("file", part))).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    floor_plan: T,
}

/// Floor-plan library over HTTP.
#[derive(Clone, Debug)]
pub struct HttpFloorPlanRepository {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpFloorPlanRepository {
    /// Creates a client for the API at `base_url`, e.g. `https://host/api`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into(),
            auth_token: None,
        })
    }

    /// Sends the session token with every request.
    #[must_use]
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, join(&self.base_url, &format!("floor-plans{path}")));
        match &self.auth_token {
            Some(token) => builder.header(reqwest::header::COOKIE, format!("auth-token={token}")),
            None => builder,
        }
    }
}

#[async_trait]
impl FloorPlanRepository for HttpFloorPlanRepository {
    async fn list(&self, query: &ListQuery) -> Result<FloorPlanPage, ServiceError> {
        send_json(self.request(reqwest::Method::GET, "").query(&query.to_pairs())).await
    }

    async fn get(&self, id: u64) -> Result<FloorPlanRecord, ServiceError> {
        send_json(self.request(reqwest::Method::GET, &format!("/{id}"))).await
    }

    async fn create(&self, plan: &NewFloorPlan) -> Result<FloorPlanSummary, ServiceError> {
        let envelope: Envelope<FloorPlanSummary> =
            send_json(self.request(reqwest::Method::POST, "").json(plan)).await?;
        Ok(envelope.floor_plan)
    }

    async fn update(
        &self,
        id: u64,
        update: &FloorPlanUpdate,
    ) -> Result<FloorPlanRecord, ServiceError> {
        let envelope: Envelope<FloorPlanRecord> =
            send_json(self.request(reqwest::Method::PUT, &format!("/{id}")).json(update)).await?;
        Ok(envelope.floor_plan)
    }

    async fn delete(&self, id: u64) -> Result<(), ServiceError> {
        let _ = check(
            self.request(reqwest::Method::DELETE, &format!("/{id}"))
                .send()
                .await?,
        )
        .await?;
        Ok(())
    }

    async fn clone_plan(
        &self,
        id: u64,
        name: Option<&str>,
    ) -> Result<FloorPlanSummary, ServiceError> {
        let body = name.map_or_else(|| json!({}), |name| json!({ "name": name }));
        let envelope: Envelope<FloorPlanSummary> = send_json(
            self.request(reqwest::Method::POST, &format!("/{id}/clone"))
                .json(&body),
        )
        .await?;
        Ok(envelope.floor_plan)
    }
}
