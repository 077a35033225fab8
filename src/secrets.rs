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

//! Credential lookup from a secret store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use thiserror::Error;
use tracing::debug;

use crate::config::SecretKeySelector;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("error getting secret <{name}> in namespace {namespace}: {source}")]
    Fetch {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("secret {namespace}/{name} has no data")]
    NoData { namespace: String, name: String },

    #[error("no key {key:?} in secret {namespace}/{name}")]
    MissingKey {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("key {key:?} in secret {namespace}/{name} is not valid UTF-8")]
    InvalidUtf8 {
        namespace: String,
        name: String,
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Resolves secret key selectors to raw secret bytes.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn secret_value(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<Vec<u8>, SecretError>;
}

/// Reads `Secret` objects from the Kubernetes API.
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
}

impl KubeSecretSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Uses the in-cluster service account or the local kubeconfig.
    pub async fn try_default() -> Result<Self, kube::Error> {
        Ok(Self::new(Client::try_default().await?))
    }
}

#[async_trait]
impl SecretSource for KubeSecretSource {
    async fn secret_value(
        &self,
        namespace: &str,
        selector: &SecretKeySelector,
    ) -> Result<Vec<u8>, SecretError> {
        let secret_api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = secret_api
            .get(&selector.name)
            .await
            .map_err(|source| SecretError::Fetch {
                namespace: namespace.to_string(),
                name: selector.name.clone(),
                source,
            })?;

        debug!(namespace, secret = %selector.name, key = %selector.key, "Loaded secret");
        lookup_key(secret.data.as_ref(), namespace, selector)
    }
}

fn lookup_key(
    data: Option<&BTreeMap<String, ByteString>>,
    namespace: &str,
    selector: &SecretKeySelector,
) -> Result<Vec<u8>, SecretError> {
    let data = data.ok_or_else(|| SecretError::NoData {
        namespace: namespace.to_string(),
        name: selector.name.clone(),
    })?;

    data.get(&selector.key)
        .map(|value| value.0.clone())
        .ok_or_else(|| SecretError::MissingKey {
            namespace: namespace.to_string(),
            name: selector.name.clone(),
            key: selector.key.clone(),
        })
}
