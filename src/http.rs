use crate::error::{ConfigError, ExportError};
use crate::sink::Transport;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Url};
use std::time::Duration;

/// Header carrying the ingestion credential.
pub const CREDENTIAL_HEADER: &str = "X-License-Key";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Transport`] that POSTs JSON payloads to a log ingestion endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    credential: HeaderValue,
}

impl HttpTransport {
    /// Build a transport for `endpoint`.
    ///
    /// **Returns**
    /// - `Err(ConfigError::InvalidEndpoint)` if `endpoint` is not an
    ///   absolute URL.
    /// - `Err(ConfigError::Transport)` if the credential cannot be used as a
    ///   header value or the HTTP client cannot be built.
    pub fn new(endpoint: &str, credential: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let mut credential = HeaderValue::from_str(credential)
            .map_err(|e| ConfigError::Transport(format!("invalid credential: {}", e)))?;
        credential.set_sensitive(true);

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            credential,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: String) -> Result<(), ExportError> {
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CREDENTIAL_HEADER, self.credential.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ExportError::transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(ExportError::Status {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
