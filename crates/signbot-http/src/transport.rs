//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use signbot_core::error::{Result, SignbotError};
use signbot_core::traits::{RawResponse, Transport, TransportError};
use signbot_core::types::{HttpMethod, RequestSpec};

const USER_AGENT: &str = concat!("Signbot/", env!("CARGO_PKG_VERSION"));

/// Real HTTP transport. One client is shared by every account in a run.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_proxy(None)
    }

    /// Route all requests through `proxy` (http, https or socks5 URL).
    pub fn with_proxy(proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(url) = proxy.filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| SignbotError::Http(format!("Invalid proxy {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| SignbotError::Http(format!("Client error: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn send(&self, request: &RequestSpec) -> std::result::Result<RawResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
        }
        .timeout(request.timeout);

        let mut has_content_type = false;
        for (name, value) in &request.headers {
            has_content_type |= name.eq_ignore_ascii_case("content-type");
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = &request.body {
            // Auto-detect content type if not set
            if !has_content_type && (body.starts_with('{') || body.starts_with('[')) {
                builder = builder.header("Content-Type", "application/json");
            }
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_error)?;
        Ok(RawResponse { status, body })
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(e.to_string())
    } else {
        TransportError::network(e.to_string())
    }
}
