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

//! Error types for provider calls, reconciliation and the solver.

use thiserror::Error;

use crate::reconciler::Action;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised by a DNS provider client
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport level failure (connect, TLS, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error document
    #[error("API error (HTTP {status}) {code}: {message} [request id: {request_id}]")]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },

    /// The response body did not have the expected shape
    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    /// Request parameters were missing or malformed
    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),

    /// Request headers could not be built
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ProviderError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        ProviderError::Signing(err.to_string())
    }
}

/// Errors raised while converging a TXT record.
///
/// Every variant carries the action, zone and record name so a failed call can
/// be diagnosed without re-running it.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{action}: failed to query TXT records for '{rr}' in zone '{zone}': {source}")]
    QueryFailed {
        action: Action,
        zone: String,
        rr: String,
        #[source]
        source: ProviderError,
    },

    /// Records deleted before the failure stay deleted.
    #[error("{action}: failed to delete record {record_id} ('{rr}' in zone '{zone}'): {source}")]
    DeleteFailed {
        action: Action,
        zone: String,
        rr: String,
        record_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("{action}: failed to create TXT record '{rr}' in zone '{zone}': {source}")]
    CreateFailed {
        action: Action,
        zone: String,
        rr: String,
        #[source]
        source: ProviderError,
    },

    #[error("{action}: deadline exceeded while reconciling '{rr}' in zone '{zone}'")]
    DeadlineExceeded {
        action: Action,
        zone: String,
        rr: String,
    },
}

/// Errors surfaced by the solver for a whole challenge request
#[derive(Debug, Error)]
pub enum SolverError {
    /// Configuration or credential lookup failed before reconciliation started
    #[error("error {step}: {source}")]
    ConfigInvalid {
        step: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl SolverError {
    pub(crate) fn config(
        step: &'static str,
        err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        SolverError::ConfigInvalid {
            step,
            source: err.into(),
        }
    }
}
