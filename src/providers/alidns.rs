// Copyright 2023 rust-dns-sdk authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Alibaba Cloud DNS (Alidns) provider.
//!
//! Talks to the RPC-style `2015-01-09` API with `ACS3-HMAC-SHA256` signed
//! requests.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use dns_solver_macros::extract_params;
use hex::encode as hex_encode;
use hmac::{Hmac, Mac};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::client::{
    DnsClient, DnsProviderBuilder, ExistingRecord, RECORD_TYPE_TXT, RecordOperationBuilder,
};
use crate::error::{ProviderError, ProviderResult};
use crate::providers::utils::{canonical_query, endpoint_host};
use crate::utils::request::DnsHttpClient;
use crate::utils::serde_utils::string_or_number;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "ACS3-HMAC-SHA256";
const API_VERSION: &str = "2015-01-09";
const DEFAULT_HOST: &str = "alidns.aliyuncs.com";
/// Largest page `DescribeDomainRecords` accepts
const PAGE_SIZE: u32 = 500;
/// Headers covered by the signature, sorted
const SIGNED_HEADERS: &str =
    "host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version";

/// Builder for creating Alidns client instances.
pub struct AliDnsBuilder<T> {
    access_key_id: Option<String>,
    access_key_secret: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    _marker: PhantomData<T>,
}

impl<T: DnsHttpClient + Default> AliDnsBuilder<T> {
    pub fn new() -> Self {
        Self {
            access_key_id: None,
            access_key_secret: None,
            region: None,
            endpoint: None,
            _marker: PhantomData,
        }
    }
}

impl<T: DnsHttpClient + Default> DnsProviderBuilder for AliDnsBuilder<T> {
    type Output = AliDns<T>;

    /// Sets configuration parameters for the DNS provider builder.
    ///
    /// Supported keys:
    /// - "access_key_id"
    /// - "access_key_secret"
    /// - "region": selects `alidns.<region>.aliyuncs.com`; empty means the
    ///   global endpoint
    /// - "endpoint": full base URL, overrides "region"
    fn set_param(mut self, key: &str, value: &str) -> ProviderResult<Self> {
        match key {
            "access_key_id" => self.access_key_id = Some(value.into()),
            "access_key_secret" => self.access_key_secret = Some(value.into()),
            "region" => self.region = Some(value.into()),
            "endpoint" => self.endpoint = Some(value.into()),
            _ => {
                return Err(ProviderError::InvalidParams(format!(
                    "unknown alidns parameter: {key}"
                )));
            }
        }
        Ok(self)
    }

    /// Constructs a new AliDns client instance using configured parameters.
    fn build(self) -> ProviderResult<AliDns<T>> {
        let access_key_id = self
            .access_key_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::InvalidParams("access_key_id is required".into()))?;
        let access_key_secret = self
            .access_key_secret
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ProviderError::InvalidParams("access_key_secret is required".into()))?;

        let endpoint = match (self.endpoint, self.region.as_deref()) {
            (Some(endpoint), _) => endpoint,
            (None, Some(region)) if !region.is_empty() => {
                format!("https://alidns.{region}.aliyuncs.com")
            }
            (None, _) => format!("https://{DEFAULT_HOST}"),
        };
        let (endpoint, host) = endpoint_host(&endpoint)?;

        debug!(%endpoint, access_key_id = %access_key_id, "Built alidns client");

        Ok(AliDns {
            http_client: T::default(),
            endpoint,
            host,
            access_key_id,
            access_key_secret,
        })
    }
}

/// Helper for signing Alidns API requests.
#[derive(Clone)]
pub(crate) struct Authorization {
    /// API endpoint host
    host: String,
    version: String,
    action: String,
    query: BTreeMap<String, String>,
    payload: String,
    date: String,
    nonce: String,
}

impl Authorization {
    /// Creates a new authorization context stamped with the current time.
    fn new(host: &str) -> Self {
        Self {
            host: host.to_string(),
            version: API_VERSION.to_string(),
            action: String::new(),
            query: BTreeMap::new(),
            payload: String::new(),
            date: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            nonce: format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>()),
        }
    }

    /// Sets the API action for authorization.
    fn action(mut self, action: &str) -> Self {
        self.action = action.to_string();
        self
    }

    /// Sets the RPC parameters carried in the query string.
    fn query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Signs a message using HMAC-SHA256 algorithm.
    fn sign(key: &[u8], msg: &str) -> ProviderResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| ProviderError::Signing(e.to_string()))?;
        mac.update(msg.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Computes SHA-256 hash of input and returns it as hexadecimal string.
    fn sha256_hex(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex_encode(hasher.finalize())
    }

    fn canonical_query(&self) -> String {
        canonical_query(&self.query)
    }

    /// Lowercase signed headers, in signing order.
    fn signed_header_values(&self) -> [(&'static str, String); 6] {
        [
            ("host", self.host.clone()),
            ("x-acs-action", self.action.clone()),
            ("x-acs-content-sha256", Self::sha256_hex(&self.payload)),
            ("x-acs-date", self.date.clone()),
            ("x-acs-signature-nonce", self.nonce.clone()),
            ("x-acs-version", self.version.clone()),
        ]
    }

    /// Generates the canonical request string.
    fn generate_canonical_request(&self) -> String {
        let http_method = "POST";
        let canonical_uri = "/";
        let canonical_query_string = self.canonical_query();
        let canonical_headers: String = self
            .signed_header_values()
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        let hashed_payload = Self::sha256_hex(&self.payload);
        format!(
            "{http_method}\n{canonical_uri}\n{canonical_query_string}\n{canonical_headers}\n{SIGNED_HEADERS}\n{hashed_payload}"
        )
    }

    /// Generates the string-to-sign for a canonical request.
    fn generate_string_to_sign(&self, canonical_request: &str) -> String {
        format!("{ALGORITHM}\n{}", Self::sha256_hex(canonical_request))
    }

    /// Generates complete authorization header for request.
    fn generate_authorization_header(
        &self,
        access_key_id: &str,
        access_key_secret: &str,
    ) -> ProviderResult<String> {
        let canonical_request = self.generate_canonical_request();
        let string_to_sign = self.generate_string_to_sign(&canonical_request);
        trace!(%canonical_request, "Signing alidns request");
        let signature = hex_encode(Self::sign(access_key_secret.as_bytes(), &string_to_sign)?);
        Ok(format!(
            "{ALGORITHM} Credential={access_key_id},SignedHeaders={SIGNED_HEADERS},Signature={signature}"
        ))
    }

    /// Builds signed HTTP request headers.
    pub fn build_request_headers(
        &self,
        access_key_id: &str,
        access_key_secret: &str,
    ) -> ProviderResult<HeaderMap> {
        let authorization_header =
            self.generate_authorization_header(access_key_id, access_key_secret)?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization_header)?);
        for (name, value) in self.signed_header_values() {
            headers.insert(name, HeaderValue::from_str(&value)?);
        }
        Ok(headers)
    }
}

/// Implementation of DNS client for Alibaba Cloud DNS.
pub struct AliDns<T: DnsHttpClient> {
    /// HTTP client for making requests
    http_client: T,
    /// API base URL, without trailing slash
    endpoint: String,
    /// Value of the `host` header
    host: String,
    /// AccessKey ID
    access_key_id: String,
    /// AccessKey Secret
    access_key_secret: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDomainRecordsResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    domain_records: DomainRecords,
}

#[derive(Deserialize, Default)]
struct DomainRecords {
    #[serde(rename = "Record", default)]
    record: Vec<DomainRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomainRecord {
    domain_name: String,
    #[serde(deserialize_with = "string_or_number")]
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(default)]
    value: String,
}

impl From<DomainRecord> for ExistingRecord {
    fn from(record: DomainRecord) -> Self {
        ExistingRecord {
            id: record.record_id,
            zone: record.domain_name,
            rr: record.rr,
            record_type: record.record_type,
            value: record.value,
        }
    }
}

#[derive(Deserialize)]
struct RecordIdResponse {
    #[serde(rename = "RecordId", deserialize_with = "string_or_number")]
    record_id: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl<T: DnsHttpClient> AliDns<T> {
    /// Sends one signed RPC call and returns the decoded success body.
    async fn call(&self, action: &str, params: BTreeMap<String, String>) -> ProviderResult<Value> {
        let authorization = Authorization::new(&self.host).action(action).query(params);
        let url = format!("{}/?{}", self.endpoint, authorization.canonical_query());
        let headers =
            authorization.build_request_headers(&self.access_key_id, &self.access_key_secret)?;

        trace!(action, %url, "Calling alidns");
        let response = self
            .http_client
            .request(Method::POST, url, headers, None)
            .await?;

        if !response.status.is_success() {
            let error: ErrorResponse = serde_json::from_value(response.body.clone())
                .unwrap_or_else(|_| ErrorResponse {
                    message: response
                        .body
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| response.body.to_string()),
                    ..Default::default()
                });
            debug!(
                action,
                status = response.status.as_u16(),
                code = %error.code,
                request_id = %error.request_id,
                "alidns call failed"
            );
            return Err(ProviderError::Api {
                status: response.status.as_u16(),
                code: error.code,
                message: error.message,
                request_id: error.request_id,
            });
        }

        Ok(response.body)
    }
}

#[async_trait]
impl<T: DnsHttpClient> DnsClient for AliDns<T> {
    fn name(&self) -> &'static str {
        "alidns"
    }

    /// Lists TXT records by `RRKeyWord`, following every page.
    async fn list_txt_records(
        &self,
        zone: &str,
        rr_keyword: &str,
    ) -> ProviderResult<Vec<ExistingRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let builder = RecordOperationBuilder::new()
                .domain(zone)
                .rr_keyword(rr_keyword)
                .record_type(RECORD_TYPE_TXT)
                .page(page, PAGE_SIZE);
            let params = extract_params!(builder, {
                required domain => "DomainName",
                optional rr_keyword => "RRKeyWord",
                required record_type => "TypeKeyWord",
                default page_number = 1 => "PageNumber",
                default page_size = PAGE_SIZE => "PageSize",
            })
            .map_err(ProviderError::InvalidParams)?;

            let body = self.call("DescribeDomainRecords", params).await?;
            let parsed: DescribeDomainRecordsResponse = serde_json::from_value(body)?;

            let fetched = parsed.domain_records.record.len();
            records.extend(
                parsed
                    .domain_records
                    .record
                    .into_iter()
                    .map(ExistingRecord::from),
            );

            if fetched == 0 || records.len() as u64 >= parsed.total_count {
                break;
            }

            page += 1;
        }

        Ok(records)
    }

    async fn delete_record(&self, record_id: &str) -> ProviderResult<()> {
        let builder = RecordOperationBuilder::new().record_id(record_id);
        let params = extract_params!(builder, {
            required record_id => "RecordId",
        })
        .map_err(ProviderError::InvalidParams)?;

        self.call("DeleteDomainRecord", params).await?;
        Ok(())
    }

    async fn create_txt_record(&self, zone: &str, rr: &str, value: &str) -> ProviderResult<String> {
        let builder = RecordOperationBuilder::new()
            .domain(zone)
            .rr(rr)
            .record_type(RECORD_TYPE_TXT)
            .value(value);
        let params = extract_params!(builder, {
            required domain => "DomainName",
            required rr => "RR",
            required record_type => "Type",
            required value => "Value",
        })
        .map_err(ProviderError::InvalidParams)?;

        let body = self.call("AddDomainRecord", params).await?;
        let parsed: RecordIdResponse = serde_json::from_value(body)?;

        Ok(parsed.record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::request::DefaultDnsClient;

    fn fixed_authorization() -> Authorization {
        let mut query = BTreeMap::new();
        query.insert("DomainName".to_string(), "example.com".to_string());
        query.insert("RRKeyWord".to_string(), "_acme-challenge".to_string());
        Authorization {
            host: DEFAULT_HOST.to_string(),
            version: API_VERSION.to_string(),
            action: "DescribeDomainRecords".to_string(),
            query,
            payload: String::new(),
            date: "2024-01-01T00:00:00Z".to_string(),
            nonce: "0123456789abcdef".to_string(),
        }
    }

    #[test]
    fn test_canonical_request_layout() {
        let canonical = fixed_authorization().generate_canonical_request();
        let lines: Vec<&str> = canonical.split('\n').collect();

        assert_eq!(lines[0], "POST");
        assert_eq!(lines[1], "/");
        assert_eq!(lines[2], "DomainName=example.com&RRKeyWord=_acme-challenge");
        assert_eq!(lines[3], "host:alidns.aliyuncs.com");
        assert_eq!(lines[4], "x-acs-action:DescribeDomainRecords");
        assert!(lines[5].starts_with("x-acs-content-sha256:"));
        assert_eq!(lines[6], "x-acs-date:2024-01-01T00:00:00Z");
        assert_eq!(lines[7], "x-acs-signature-nonce:0123456789abcdef");
        assert_eq!(lines[8], "x-acs-version:2015-01-09");
        assert_eq!(lines[9], "");
        assert_eq!(lines[10], SIGNED_HEADERS);
        // sha256 of the empty body
        assert_eq!(
            lines[11],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_authorization_header_format() {
        let auth = fixed_authorization();
        let header = auth.generate_authorization_header("ak-id", "ak-secret").unwrap();

        let prefix = format!("{ALGORITHM} Credential=ak-id,SignedHeaders={SIGNED_HEADERS},Signature=");
        assert!(header.starts_with(&prefix));
        let signature = &header[prefix.len()..];
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));

        // deterministic for identical inputs, sensitive to the secret
        assert_eq!(header, auth.generate_authorization_header("ak-id", "ak-secret").unwrap());
        assert_ne!(header, auth.generate_authorization_header("ak-id", "other").unwrap());
    }

    #[test]
    fn test_request_headers_cover_signed_set() {
        let headers = fixed_authorization()
            .build_request_headers("ak-id", "ak-secret")
            .unwrap();

        for name in SIGNED_HEADERS.split(';') {
            assert!(headers.contains_key(name), "missing header {name}");
        }
        assert!(headers.contains_key("authorization"));
        assert_eq!(headers["x-acs-version"], "2015-01-09");
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let a = Authorization::new(DEFAULT_HOST);
        let b = Authorization::new(DEFAULT_HOST);
        assert_eq!(a.nonce.len(), 32);
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_builder_selects_endpoint() {
        let client = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("access_key_id", "id")
            .unwrap()
            .set_param("access_key_secret", "secret")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(client.endpoint, "https://alidns.aliyuncs.com");
        assert_eq!(client.host, "alidns.aliyuncs.com");

        let client = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("access_key_id", "id")
            .and_then(|b| b.set_param("access_key_secret", "secret"))
            .and_then(|b| b.set_param("region", "cn-hangzhou"))
            .and_then(|b| b.build())
            .unwrap();
        assert_eq!(client.endpoint, "https://alidns.cn-hangzhou.aliyuncs.com");

        let client = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("access_key_id", "id")
            .and_then(|b| b.set_param("access_key_secret", "secret"))
            .and_then(|b| b.set_param("region", "cn-hangzhou"))
            .and_then(|b| b.set_param("endpoint", "http://127.0.0.1:9000/"))
            .and_then(|b| b.build())
            .unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9000");
        assert_eq!(client.host, "127.0.0.1:9000");
    }

    #[test]
    fn test_builder_rejects_unknown_and_missing_params() {
        let err = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("secret_id", "x")
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::InvalidParams(_)));

        let err = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("access_key_id", "id")
            .and_then(|b| b.build())
            .err()
            .unwrap();
        assert!(err.to_string().contains("access_key_secret"));

        let err = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("access_key_id", "")
            .and_then(|b| b.set_param("access_key_secret", "secret"))
            .and_then(|b| b.build())
            .err()
            .unwrap();
        assert!(err.to_string().contains("access_key_id"));
    }

    #[test]
    fn test_domain_record_conversion() {
        let record: DomainRecord = serde_json::from_value(serde_json::json!({
            "DomainName": "example.com",
            "RecordId": "9999985",
            "RR": "_acme-challenge",
            "Type": "TXT",
            "Value": "abc",
            "TTL": 600,
            "Line": "default",
            "Status": "ENABLE",
            "Locked": false
        }))
        .unwrap();

        let existing = ExistingRecord::from(record);
        assert_eq!(existing.id, "9999985");
        assert!(existing.matches("example.com", "_acme-challenge", "abc"));
    }
}
