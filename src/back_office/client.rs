use color_eyre::{eyre::eyre, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::api_types::{ApiRequest, ApiRowsResponse};
use super::BackOffice;
use crate::config::{BackOfficeConfig, Config};
use crate::error::RefDataError;

/// HTTP client for the back office reference data service
#[derive(Clone)]
pub struct BackOfficeClient {
  http: reqwest::Client,
  base_url: Url,
  username: String,
  password: String,
}

impl BackOfficeClient {
  pub fn new(config: &BackOfficeConfig) -> Result<Self> {
    let password = Config::get_back_office_password()?;
    Self::with_password(config, password)
  }

  pub fn with_password(config: &BackOfficeConfig, password: String) -> Result<Self> {
    let mut base_url = Url::parse(&config.url)
      .map_err(|e| eyre!("Invalid back office url {}: {}", config.url, e))?;

    // Keep the last path segment when joining operation names
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create back office client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      username: config.username.clone(),
      password,
    })
  }

  /// Endpoint for an operation
  pub fn endpoint(&self, operation: &str) -> std::result::Result<Url, url::ParseError> {
    self.base_url.join(operation)
  }
}

impl BackOffice for BackOfficeClient {
  async fn fetch_rows<R: DeserializeOwned + Send>(
    &self,
    namespace: &'static str,
    operation: &'static str,
  ) -> crate::error::Result<Vec<R>> {
    let endpoint = self
      .endpoint(operation)
      .map_err(|e| RefDataError::source_fetch(namespace, format!("invalid endpoint: {}", e)))?;

    let response = self
      .http
      .post(endpoint)
      .basic_auth(&self.username, Some(&self.password))
      .json(&ApiRequest {
        operation,
        username: &self.username,
      })
      .send()
      .await
      .map_err(|e| RefDataError::source_fetch(namespace, format!("{} failed: {}", operation, e)))?;

    let status = response.status();
    if !status.is_success() {
      return Err(RefDataError::source_fetch(
        namespace,
        format!("{} returned HTTP {}", operation, status),
      ));
    }

    let body: ApiRowsResponse<R> = response.json().await.map_err(|e| {
      RefDataError::source_fetch(namespace, format!("unreadable {} response: {}", operation, e))
    })?;

    if !body.success {
      return Err(RefDataError::source_fetch(
        namespace,
        format!("{} rejected: {}", operation, body.message_text()),
      ));
    }

    debug!(namespace, operation, rows = body.rows.len(), "back office rows received");
    Ok(body.rows)
  }
}
