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

//! Idempotent present/clean-up of a single challenge TXT record.
//!
//! Each call re-reads the provider before writing, so concurrent challenges
//! sharing a record name only ever touch records holding their own value.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::DnsClient;
use crate::error::{ProviderError, ReconcileError};

/// Desired state of the challenge record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Ensure a record holding the value exists
    Present,
    /// Ensure no record holding the value exists
    CleanUp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Present => f.write_str("Present"),
            Action::CleanUp => f.write_str("CleanUp"),
        }
    }
}

/// Converges TXT records through a [`DnsClient`].
///
/// Holds no record state between calls.
pub struct Reconciler<'a, C: DnsClient + ?Sized> {
    client: &'a C,
    deadline: Option<Instant>,
}

impl<'a, C: DnsClient + ?Sized> Reconciler<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            deadline: None,
        }
    }

    /// Bounds every provider call by `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Drives the records named `rr` in `zone` towards `action` for `value`.
    ///
    /// `zone` and `rr` must already be normalized (no trailing dot).
    ///
    /// - `Present` returns as soon as an exact match is seen, otherwise creates
    ///   one record.
    /// - `CleanUp` deletes every exact match and never creates.
    ///
    /// A failure aborts the pass; deletes done before it are not rolled back.
    pub async fn reconcile(
        &self,
        action: Action,
        zone: &str,
        rr: &str,
        value: &str,
    ) -> Result<(), ReconcileError> {
        debug!(
            provider = self.client.name(),
            %action,
            zone,
            rr,
            "Reconciling challenge record"
        );

        let candidates = self
            .bounded(action, zone, rr, self.client.list_txt_records(zone, rr))
            .await?
            .map_err(|source| ReconcileError::QueryFailed {
                action,
                zone: zone.to_string(),
                rr: rr.to_string(),
                source,
            })?;

        debug!(zone, rr, count = candidates.len(), "Queried candidate records");

        for record in &candidates {
            if !record.matches(zone, rr, value) {
                debug!(
                    record_id = %record.id,
                    record_rr = %record.rr,
                    "Skipping record held by another value or name"
                );
                continue;
            }

            if action == Action::Present {
                info!(record_id = %record.id, zone, rr, "Challenge record already present");
                return Ok(());
            }

            self.bounded(action, zone, rr, self.client.delete_record(&record.id))
                .await?
                .map_err(|source| ReconcileError::DeleteFailed {
                    action,
                    zone: zone.to_string(),
                    rr: rr.to_string(),
                    record_id: record.id.clone(),
                    source,
                })?;

            info!(record_id = %record.id, zone, rr, "Deleted challenge record");
        }

        if action == Action::Present {
            let record_id = self
                .bounded(action, zone, rr, self.client.create_txt_record(zone, rr, value))
                .await?
                .map_err(|source| ReconcileError::CreateFailed {
                    action,
                    zone: zone.to_string(),
                    rr: rr.to_string(),
                    source,
                })?;

            info!(%record_id, zone, rr, "Added challenge record");
        }

        Ok(())
    }

    /// Runs `call` under the deadline, if one is set.
    async fn bounded<T>(
        &self,
        action: Action,
        zone: &str,
        rr: &str,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<Result<T, ProviderError>, ReconcileError> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, call).await.map_err(|_| {
                ReconcileError::DeadlineExceeded {
                    action,
                    zone: zone.to_string(),
                    rr: rr.to_string(),
                }
            }),
            None => Ok(call.await),
        }
    }
}
