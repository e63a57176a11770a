//! reqwest-backed [`HttpClient`] for API tasks.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;

use bizbrain_core::http::HttpClient;
use bizbrain_types::config::HttpSettings;
use bizbrain_types::http::{HttpError, HttpRequest, HttpResponse};

/// Outbound HTTP client shared by all API tasks of a process.
///
/// The per-request timeout here is a transport budget; the engine's guard
/// enforces the task-level timeout on top of it.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| HttpError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn build(&self, request: &HttpRequest) -> Result<reqwest::RequestBuilder, HttpError> {
        let method = parse_method(&request.method)?;
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| HttpError::InvalidRequest(format!("invalid url '{}': {e}", request.url)))?;

        let mut builder = self.client.request(method, url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}

fn parse_method(method: &str) -> Result<Method, HttpError> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| HttpError::InvalidRequest(format!("invalid HTTP method '{method}'")))
}

fn map_send_error(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout
    } else if err.is_builder() {
        HttpError::InvalidRequest(err.to_string())
    } else {
        HttpError::Transport(err.to_string())
    }
}

impl HttpClient for ReqwestHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let builder = self.build(&request)?;
        tracing::debug!(method = %request.method, url = %request.url, "sending API task request");

        let response = builder.send().await.map_err(map_send_error)?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(map_send_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
