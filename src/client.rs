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

//! Provider capability used by the reconciler.
//!
//! A provider only has to list, delete and create TXT records. Any DNS API can
//! be adapted behind [`DnsClient`] without touching the reconciliation logic.

use async_trait::async_trait;

use crate::error::ProviderResult;

/// Record type managed by the solver
pub const RECORD_TYPE_TXT: &str = "TXT";

/// A record as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingRecord {
    /// Provider-assigned identifier, needed for deletion
    pub id: String,
    /// Zone the record lives in, without trailing dot
    pub zone: String,
    /// Zone-relative record name
    pub rr: String,
    pub record_type: String,
    pub value: String,
}

impl ExistingRecord {
    /// Exact (zone, rr, value) comparison.
    pub fn matches(&self, zone: &str, rr: &str, value: &str) -> bool {
        self.zone == zone && self.rr == rr && self.value == value
    }
}

/// Narrow TXT record capability of a DNS provider.
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &'static str;

    /// Lists TXT records in `zone` whose name matches `rr_keyword`.
    ///
    /// Providers may match by keyword or substring, so the result is a
    /// candidate set that callers must filter exactly.
    async fn list_txt_records(
        &self,
        zone: &str,
        rr_keyword: &str,
    ) -> ProviderResult<Vec<ExistingRecord>>;

    /// Deletes a record by its provider identifier.
    async fn delete_record(&self, record_id: &str) -> ProviderResult<()>;

    /// Creates a TXT record and returns its provider identifier.
    async fn create_txt_record(&self, zone: &str, rr: &str, value: &str) -> ProviderResult<String>;
}

/// Builds a provider client from string-keyed settings.
pub trait DnsProviderBuilder: Sized {
    type Output: DnsClient;

    /// Sets one configuration parameter. Unknown keys are rejected.
    fn set_param(self, key: &str, value: &str) -> ProviderResult<Self>;

    /// Constructs the client, failing if a required parameter is missing.
    fn build(self) -> ProviderResult<Self::Output>;
}

/// Parameters of a single record operation.
///
/// Providers turn the populated fields into request parameters with
/// `extract_params!`.
#[derive(Debug, Default, Clone)]
pub struct RecordOperationBuilder {
    pub(crate) domain: Option<String>,
    pub(crate) rr: Option<String>,
    pub(crate) rr_keyword: Option<String>,
    pub(crate) record_type: Option<String>,
    pub(crate) value: Option<String>,
    pub(crate) record_id: Option<String>,
    pub(crate) page_number: Option<u32>,
    pub(crate) page_size: Option<u32>,
}

impl RecordOperationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }

    pub fn rr(mut self, rr: &str) -> Self {
        self.rr = Some(rr.to_string());
        self
    }

    pub fn rr_keyword(mut self, keyword: &str) -> Self {
        self.rr_keyword = Some(keyword.to_string());
        self
    }

    pub fn record_type(mut self, record_type: &str) -> Self {
        self.record_type = Some(record_type.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn record_id(mut self, record_id: &str) -> Self {
        self.record_id = Some(record_id.to_string());
        self
    }

    pub fn page(mut self, number: u32, size: u32) -> Self {
        self.page_number = Some(number);
        self.page_size = Some(size);
        self
    }
}
