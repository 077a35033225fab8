use reqwest::{Client, Method, StatusCode, header::HeaderMap};
use serde_json::Value;

use crate::error::ProviderResult;

/// Status and decoded body of a provider response.
///
/// Bodies that are not JSON are kept as a JSON string, empty bodies as null.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub trait DnsHttpClient: Send + Sync {
    fn request(
        &self,
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Option<String>,
    ) -> impl Future<Output = ProviderResult<HttpResponse>> + Send;
}

pub struct DefaultDnsClient {
    inner: Client,
}

impl DefaultDnsClient {
    pub fn new() -> Self {
        Self {
            inner: Client::new(),
        }
    }
}

impl Default for DefaultDnsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsHttpClient for DefaultDnsClient {
    async fn request(
        &self,
        method: Method,
        url: String,
        headers: HeaderMap,
        body: Option<String>,
    ) -> ProviderResult<HttpResponse> {
        let mut req = self.inner.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }
        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        Ok(HttpResponse {
            status,
            body: decode_body(text),
        })
    }
}

fn decode_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
