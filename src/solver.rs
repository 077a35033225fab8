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

//! Challenge request handling.
//!
//! For every request the solver decodes the issuer config, loads the access
//! key pair, builds a fresh provider client and runs the reconciler. Nothing is
//! shared between requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::info;

use crate::client::{DnsClient, DnsProviderBuilder};
use crate::config::{SecretKeySelector, load_config};
use crate::error::{ReconcileError, SolverError};
use crate::name::{resolve_rr, un_fqdn};
use crate::providers::alidns::{AliDns, AliDnsBuilder};
use crate::reconciler::{Action, Reconciler};
use crate::secrets::{SecretError, SecretSource};
use crate::utils::request::DefaultDnsClient;

/// A DNS-01 challenge request as delivered by the validation framework.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    #[serde(default)]
    pub uid: String,
    pub action: Action,
    /// Name the TXT record must be served under, e.g. `_acme-challenge.example.com.`
    #[serde(rename = "resolvedFQDN")]
    pub resolved_fqdn: String,
    /// Zone holding `resolved_fqdn`, e.g. `example.com.`
    pub resolved_zone: String,
    /// Expected TXT value
    pub key: String,
    #[serde(default)]
    pub resource_namespace: String,
    #[serde(default)]
    pub config: Option<Value>,
}

/// Resolves the record name for `fqdn` in `zone` and converges it.
///
/// `timeout` bounds the whole reconciliation, measured from this call.
pub async fn reconcile_challenge<C: DnsClient + ?Sized>(
    client: &C,
    action: Action,
    fqdn: &str,
    zone: &str,
    value: &str,
    timeout: Option<Duration>,
) -> Result<(), ReconcileError> {
    let zone = un_fqdn(zone);
    let rr = resolve_rr(fqdn, zone);

    let mut reconciler = Reconciler::new(client);
    if let Some(timeout) = timeout {
        reconciler = reconciler.with_deadline(Instant::now() + timeout);
    }
    reconciler.reconcile(action, zone, &rr, value).await
}

/// Alibaba Cloud DNS solver.
pub struct AliDnsSolver<S: SecretSource> {
    secrets: S,
    timeout: Option<Duration>,
    endpoint: Option<String>,
}

impl<S: SecretSource> AliDnsSolver<S> {
    pub fn new(secrets: S) -> Self {
        Self {
            secrets,
            timeout: None,
            endpoint: None,
        }
    }

    /// Bounds each request's reconciliation.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sends provider calls to `endpoint` instead of the regional one.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Name of this solver within its webhook group.
    pub fn name(&self) -> &'static str {
        "alidns"
    }

    /// Ensures the challenge record exists. Safe to call repeatedly.
    pub async fn present(&self, request: &ChallengeRequest) -> Result<(), SolverError> {
        info!(fqdn = %request.resolved_fqdn, zone = %request.resolved_zone, "present");
        self.run(Action::Present, request).await
    }

    /// Removes the record holding this request's key, leaving records of
    /// other challenges for the same name in place.
    pub async fn clean_up(&self, request: &ChallengeRequest) -> Result<(), SolverError> {
        info!(fqdn = %request.resolved_fqdn, zone = %request.resolved_zone, "cleaning up");
        self.run(Action::CleanUp, request).await
    }

    /// Dispatches on the request's own action.
    pub async fn solve(&self, request: &ChallengeRequest) -> Result<(), SolverError> {
        match request.action {
            Action::Present => self.present(request).await,
            Action::CleanUp => self.clean_up(request).await,
        }
    }

    async fn run(&self, action: Action, request: &ChallengeRequest) -> Result<(), SolverError> {
        let client = self.client_for(request).await?;
        reconcile_challenge(
            &client,
            action,
            &request.resolved_fqdn,
            &request.resolved_zone,
            &request.key,
            self.timeout,
        )
        .await?;
        Ok(())
    }

    async fn client_for(
        &self,
        request: &ChallengeRequest,
    ) -> Result<AliDns<DefaultDnsClient>, SolverError> {
        let cfg = load_config(request.config.as_ref())
            .map_err(|e| SolverError::config("decoding solver config", e))?;

        let namespace = &request.resource_namespace;
        let access_key_id = self
            .load_secret(namespace, &cfg.access_key_secret_ref)
            .await
            .map_err(|e| SolverError::config("loading access key id", e))?;
        let access_key_secret = self
            .load_secret(namespace, &cfg.secret_key_secret_ref)
            .await
            .map_err(|e| SolverError::config("loading access key secret", e))?;

        let mut builder = AliDnsBuilder::<DefaultDnsClient>::new()
            .set_param("access_key_id", &access_key_id)
            .and_then(|b| b.set_param("access_key_secret", &access_key_secret))
            .and_then(|b| b.set_param("region", &cfg.region))
            .map_err(|e| SolverError::config("building provider client", e))?;
        if let Some(endpoint) = &self.endpoint {
            builder = builder
                .set_param("endpoint", endpoint)
                .map_err(|e| SolverError::config("building provider client", e))?;
        }

        builder
            .build()
            .map_err(|e| SolverError::config("building provider client", e))
    }

    async fn load_secret(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<String, SecretError> {
        let bytes = self.secrets.secret_value(namespace, selector).await?;
        // surrounding whitespace is not part of the key
        String::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|source| SecretError::InvalidUtf8 {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
                key: selector.key.clone(),
                source,
            })
    }
}
