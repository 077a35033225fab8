//! ACME DNS-01 solver for Alibaba Cloud DNS
//!
//! Converges a single `_acme-challenge` TXT record towards the state a
//! challenge request asks for:
//! - `Present` makes sure a record with the challenge value exists
//! - `CleanUp` removes every record carrying the challenge value, and nothing else
//!
//! Records owned by other challenges under the same name are never touched, so
//! `example.com` and `*.example.com` can be validated at the same time.
//!
//! # Example
//! ```no_run
//! use alidns_solver::client::DnsProviderBuilder;
//! use alidns_solver::name::{resolve_rr, un_fqdn};
//! use alidns_solver::providers::alidns::AliDnsBuilder;
//! use alidns_solver::reconciler::{Action, Reconciler};
//! use alidns_solver::utils::request::DefaultDnsClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AliDnsBuilder::<DefaultDnsClient>::new()
//!     .set_param("access_key_id", "your_id")?
//!     .set_param("access_key_secret", "your_secret")?
//!     .build()?;
//!
//! let zone = un_fqdn("example.com.");
//! let rr = resolve_rr("_acme-challenge.example.com.", zone);
//! Reconciler::new(&client)
//!     .reconcile(Action::Present, zone, &rr, "token")
//!     .await?;
//! # Ok(())
//! # }
//! ```

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

pub mod client;
pub mod config;
pub mod error;
pub mod name;
pub mod providers;
pub mod reconciler;
pub mod secrets;
pub mod solver;
pub mod utils;
