//! API client module
//!
//! This module provides HTTP client functionality to interact with the
//! stepwise API server.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, Error as ReqwestError};
use serde::Deserialize;

use crate::models::{Recorded, Step, StepInput};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Generic API response structure
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, ClientError> {
        if self.success {
            self.data.ok_or(ClientError::MissingData)
        } else {
            Err(ClientError::Api(
                self.error.unwrap_or_else(|| "Unknown API error".to_string()),
            ))
        }
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Missing data in response")]
    MissingData,
}

/// API client for the stepwise service
#[derive(Debug, Clone)]
pub struct Client {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl Client {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    /// Record a step
    ///
    /// A 400 still carries the envelope, so rejections surface as
    /// [`ClientError::Api`] with the validator's message.
    pub async fn record_step(&self, input: &StepInput) -> Result<Recorded, ClientError> {
        let url = format!("{}/api/steps", self.config.base_url);
        let response = self.http_client.post(&url).json(input).send().await?;
        let api_response: ApiResponse<Recorded> = response.json().await?;
        api_response.into_result()
    }

    /// Get the recorded step history, in acceptance order
    pub async fn history(&self) -> Result<Vec<Step>, ClientError> {
        let url = format!("{}/api/steps", self.config.base_url);
        let response = self.http_client.get(&url).send().await?;
        let api_response: ApiResponse<Vec<Step>> = response.json().await?;
        api_response.into_result()
    }

    /// Get the known branch labels
    pub async fn branches(&self) -> Result<Vec<String>, ClientError> {
        #[derive(Deserialize)]
        struct BranchesResponse {
            branches: Vec<String>,
        }

        let url = format!("{}/api/branches", self.config.base_url);
        let response = self.http_client.get(&url).send().await?;
        let api_response: ApiResponse<BranchesResponse> = response.json().await?;
        api_response.into_result().map(|b| b.branches)
    }

    /// Clear all recorded history
    pub async fn reset(&self) -> Result<(), ClientError> {
        let url = format!("{}/api/reset", self.config.base_url);
        let response = self.http_client.post(&url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let api_response: ApiResponse<()> = response.json().await?;
            Err(ClientError::Api(
                api_response
                    .error
                    .unwrap_or_else(|| "Unknown API error".to_string()),
            ))
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
