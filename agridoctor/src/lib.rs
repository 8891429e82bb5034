pub mod form;
pub mod guard;
pub mod present;
pub mod session;
pub mod types;

use crate::types::{
    AuthResponse, Credentials, CropPrediction, DiseaseDetection, ErrorBody, ErrorDetail,
    FertilizerPrediction, FertilizerRequest, HistoryEntry, HistoryPage, ImageUpload, ModelHealth,
    Registration, SoilReadings, UserProfile,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),
    /// Credentials or bearer token rejected by the service.
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },
    /// Non-success status with an optional structured `detail`.
    #[error("server error ({status}){}", detail_suffix(.detail))]
    Server {
        status: u16,
        detail: Option<ErrorDetail>,
    },
    /// Transport failure or unreadable response body.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),
}

fn detail_suffix(detail: &Option<ErrorDetail>) -> String {
    detail
        .as_ref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

impl Error {
    fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.detail);
        if matches!(status, 401 | 403) {
            return Self::Auth {
                status,
                message: detail.map_or_else(|| "Not authenticated".to_string(), |d| d.to_string()),
            };
        }
        Self::Server { status, detail }
    }

    /// True when the service rejected the caller's identity.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// The human-readable message carried by the error, if any.
    /// Transport and storage failures carry none.
    #[must_use]
    pub fn detail_message(&self) -> Option<String> {
        match self {
            Self::Validation(message) | Self::Auth { message, .. } => Some(message.clone()),
            Self::Server {
                detail: Some(detail),
                ..
            } => Some(detail.to_string()),
            Self::Server { detail: None, .. } | Self::Network(_) | Self::Storage(_) => None,
        }
    }

    /// Treats a server-side rejection of an auth request as an auth failure.
    pub(crate) fn into_auth(self, fallback: &str) -> Self {
        match self {
            Self::Server { status, detail } => Self::Auth {
                status,
                message: detail.map_or_else(|| fallback.to_string(), |d| d.to_string()),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgriClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl AgriClient {
    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn decode<T>(response: Response) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(Error::from);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %body, "request rejected");
        Err(Error::from_status(status.as_u16(), &body))
    }

    async fn get<T, U>(&self, endpoint: &str, query: &U) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        U: serde::ser::Serialize + ?Sized,
    {
        debug!(endpoint, "GET");
        let response = self
            .authorize(self.client.get(self.url(endpoint)))
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
        B: serde::ser::Serialize + ?Sized,
    {
        debug!(endpoint, "POST");
        let response = self
            .authorize(self.client.post(self.url(endpoint)))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn post_multipart<T>(&self, endpoint: &str, form: Form) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!(endpoint, "POST multipart");
        let response = self
            .authorize(self.client.post(self.url(endpoint)))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Creates a new unauthenticated `AgriClient` for the given API base URL,
    /// e.g. `http://localhost:8000/api`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Sets the bearer token attached to every request.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Applies a per-request timeout. No timeout is set by default.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub(crate) fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchanges credentials for a token.
    ///
    /// # Errors
    /// Returns [`Error::Auth`] when the credentials are rejected, otherwise a
    /// network or server error.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, Error> {
        self.post("auth/login", credentials).await
    }

    /// Creates an account and returns its first token.
    ///
    /// # Errors
    /// Returns a server error on rejection (e.g. duplicate email) or a network error.
    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, Error> {
        self.post("auth/register", registration).await
    }

    /// Retrieves the profile behind the current token.
    ///
    /// # Errors
    /// Returns [`Error::Auth`] if the token is missing, expired or invalid.
    pub async fn me(&self) -> Result<UserProfile, Error> {
        self.get("auth/me", &()).await
    }

    /// Requests a crop recommendation for the given soil and climate readings.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the service rejects the input.
    pub async fn predict_crop(&self, readings: &SoilReadings) -> Result<CropPrediction, Error> {
        self.post("predict/crop", readings).await
    }

    /// Requests a fertilizer recommendation.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the service rejects the input.
    pub async fn predict_fertilizer(
        &self,
        request: &FertilizerRequest,
    ) -> Result<FertilizerPrediction, Error> {
        self.post("predict/fertilizer", request).await
    }

    /// Uploads a leaf image as multipart field `file` for classification.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the service rejects the image.
    pub async fn detect_disease(&self, image: &ImageUpload) -> Result<DiseaseDetection, Error> {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)?;
        let form = Form::new().part("file", part);
        self.post_multipart("disease/detect", form).await
    }

    /// Recent crop predictions, newest first. Failures yield an empty list.
    pub async fn crop_history(&self, limit: Option<u32>) -> Vec<HistoryEntry> {
        self.fetch_history("predict/crop/history", limit).await
    }

    /// Recent fertilizer predictions, newest first. Failures yield an empty list.
    pub async fn fertilizer_history(&self, limit: Option<u32>) -> Vec<HistoryEntry> {
        self.fetch_history("predict/fertilizer/history", limit).await
    }

    /// Recent disease detections, newest first. Failures yield an empty list.
    pub async fn disease_history(&self, limit: Option<u32>) -> Vec<HistoryEntry> {
        self.fetch_history("disease/history", limit).await
    }

    async fn fetch_history(&self, endpoint: &str, limit: Option<u32>) -> Vec<HistoryEntry> {
        let query: Vec<(&str, String)> = limit
            .map(|limit| ("limit", limit.to_string()))
            .into_iter()
            .collect();
        match self.get::<HistoryPage, _>(endpoint, &query).await {
            Ok(page) => page.predictions,
            Err(err) => {
                warn!(endpoint, error = %err, "history unavailable");
                Vec::new()
            }
        }
    }

    /// Liveness of the crop/fertilizer model backend.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the model is not loaded.
    pub async fn prediction_health(&self) -> Result<ModelHealth, Error> {
        self.get("predict/health", &()).await
    }

    /// Liveness of the disease detection backend.
    ///
    /// # Errors
    /// Returns an error if the HTTP request fails or the model is not loaded.
    pub async fn disease_health(&self) -> Result<ModelHealth, Error> {
        self.get("disease/health", &()).await
    }
}
