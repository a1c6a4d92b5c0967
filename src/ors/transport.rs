#![forbid(unsafe_code)]

use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, error};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;

use crate::utils::errors::PlannerError;

// ***************************************************************************
//                                Constants
// ***************************************************************************
pub const HTTP_BAD_GATEWAY : u16 = 502;
pub const HTTP_GATEWAY_TIMEOUT : u16 = 504;

// ---------------------------------------------------------------------------
// ProviderReply:
// ---------------------------------------------------------------------------
/// Raw status and body of a provider response.  Interpretation is left to
/// the gateways.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub status: u16,
    pub body: String,
}

impl ProviderReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// ProviderTransport:
// ---------------------------------------------------------------------------
/// How the gateways reach the provider.  Paths are relative to the provider
/// base URL and the credential is attached by the implementation.  Timeouts
/// and connection failures come back as upstream errors.
pub trait ProviderTransport: Send + Sync {
    fn get<'a>(&'a self, path: &'a str, query: Vec<(&'static str, String)>, timeout: Duration)
        -> BoxFuture<'a, Result<ProviderReply, PlannerError>>;

    fn post_json<'a>(&'a self, path: &'a str, body: serde_json::Value, timeout: Duration)
        -> BoxFuture<'a, Result<ProviderReply, PlannerError>>;
}

// ***************************************************************************
//                              HttpTransport
// ***************************************************************************
/// reqwest based transport used in production.
pub struct HttpTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl HttpTransport {
    pub fn new(api_key: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_reply(url: &str, response: reqwest::Response) -> Result<ProviderReply, PlannerError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(url, e))?;
        debug!("[PROVIDER] {} answered {} ({} bytes)", url, status, body.len());
        Ok(ProviderReply {status, body})
    }
}

impl ProviderTransport for HttpTransport {
    fn get<'a>(&'a self, path: &'a str, mut query: Vec<(&'static str, String)>, timeout: Duration)
        -> BoxFuture<'a, Result<ProviderReply, PlannerError>>
    {
        Box::pin(async move {
            let url = self.url(path);
            query.push(("api_key", self.api_key.clone()));
            debug!("[PROVIDER] GET {}", url);

            let response = self.client
                .get(&url)
                .header(AUTHORIZATION, &self.api_key)
                .query(&query)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| transport_error(&url, e))?;
            Self::read_reply(&url, response).await
        })
    }

    fn post_json<'a>(&'a self, path: &'a str, body: serde_json::Value, timeout: Duration)
        -> BoxFuture<'a, Result<ProviderReply, PlannerError>>
    {
        Box::pin(async move {
            let url = self.url(path);
            debug!("[PROVIDER] POST {} body: {}", url, body);

            let response = self.client
                .post(&url)
                .header(AUTHORIZATION, &self.api_key)
                .header(CONTENT_TYPE, "application/json")
                .json(&body)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| transport_error(&url, e))?;
            Self::read_reply(&url, response).await
        })
    }
}

// ---------------------------------------------------------------------------
// transport_error:
// ---------------------------------------------------------------------------
fn transport_error(url: &str, e: reqwest::Error) -> PlannerError {
    // The request url carries the api_key query parameter.
    let e = e.without_url();
    if e.is_timeout() {
        error!("Provider request to {} timed out: {}", url, e);
        PlannerError::upstream(HTTP_GATEWAY_TIMEOUT, format!("Provider request to {} timed out", url))
    } else {
        error!("Provider request to {} failed: {}", url, e);
        PlannerError::upstream(HTTP_BAD_GATEWAY, format!("Provider request to {} failed: {}", url, e))
    }
}
