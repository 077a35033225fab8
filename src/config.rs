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

//! Per-issuer solver configuration.
//!
//! Decoded from the `config` object of a challenge request. It only references
//! secrets; the key material itself is looked up through a
//! [`SecretSource`](crate::secrets::SecretSource).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Points at one key of a namespaced secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,
    /// Key inside the secret's data
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolverConfig {
    /// Alibaba Cloud region; empty selects the global endpoint
    #[serde(alias = "regionId")]
    pub region: String,
    #[serde(alias = "accessTokenSecretRef")]
    pub access_key_secret_ref: SecretKeySelector,
    pub secret_key_secret_ref: SecretKeySelector,
}

/// Decodes the solver configuration; a missing or null config yields the default.
pub fn load_config(raw: Option<&Value>) -> Result<SolverConfig, serde_json::Error> {
    match raw {
        None | Some(Value::Null) => Ok(SolverConfig::default()),
        Some(value) => SolverConfig::deserialize(value),
    }
}
