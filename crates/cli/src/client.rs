//! API client for the MediScan prediction service

use anyhow::{Context, Result};
use mediscan_lib::{Disease, RawInputRecord};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub use mediscan_lib::reference::{FormField, FormSchema};
pub use mediscan_lib::ModelStatus;

/// HTTP client for the prediction API
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        parse_success(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.send_post(path, body).await?;
        parse_success(response).await
    }

    /// POST that parses the body whatever the status, for endpoints that
    /// report failures in their normal response shape
    pub async fn post_any_status<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, T)> {
        let response = self.send_post(path, body).await?;
        let status = response.status();
        let body = response.text().await.context("Failed to read response")?;
        match serde_json::from_str(&body) {
            Ok(parsed) => Ok((status, parsed)),
            Err(_) => Err(api_error(status, &body)),
        }
    }

    async fn send_post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.base_url.join(path).context("Invalid path")?;
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")
    }

    pub async fn models(&self) -> Result<Vec<ModelStatus>> {
        self.get("api/v1/models").await
    }

    pub async fn schema(&self, disease: Disease) -> Result<FormSchema> {
        self.get(&format!("api/v1/models/{}/schema", disease.key()))
            .await
    }

    pub async fn predict(
        &self,
        disease: Disease,
        features: RawInputRecord,
    ) -> Result<PredictResponse> {
        self.post(
            &format!("api/v1/predict/{}", disease.key()),
            &PredictRequest { features },
        )
        .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(StatusCode, AuthResponse)> {
        self.post_any_status("api/v1/auth/register", request).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<(StatusCode, AuthResponse)> {
        self.post_any_status("api/v1/auth/login", request).await
    }
}

async fn parse_success<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status, &body));
    }
    response.json().await.context("Failed to parse response")
}

/// Prefer the server's error message over the raw body
fn api_error(status: StatusCode, body: &str) -> anyhow::Error {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(e) => anyhow::anyhow!("API error ({}): {}", status, e.error),
        Err(_) => anyhow::anyhow!("API error ({}): {}", status, body),
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub features: RawInputRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub disease: Disease,
    pub display_name: String,
    pub label: u8,
    pub result: String,
    pub confidence: f64,
    pub confidence_display: String,
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub kind: Option<String>,
}
