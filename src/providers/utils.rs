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

use std::collections::BTreeMap;

use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::error::{ProviderError, ProviderResult};

/// Percent-encodes a query component per RFC 3986.
///
/// `form_urlencoded` leaves `*` alone, turns spaces into `+` and escapes `~`;
/// signed requests need `%2A`, `%20` and a bare `~` instead.
pub fn percent_encode(input: &str) -> String {
    byte_serialize(input.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Builds the canonical query string: encoded `key=value` pairs sorted by key.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits an endpoint into its normalized base URL and `Host` header value.
///
/// # Process Description
///
/// 1. Parses the endpoint, which must be an absolute http(s) URL.
/// 2. Takes the host, adding the port when it is not the scheme default.
/// 3. Drops any trailing slash so paths can be appended verbatim.
pub fn endpoint_host(endpoint: &str) -> ProviderResult<(String, String)> {
    let url = Url::parse(endpoint)
        .map_err(|e| ProviderError::InvalidParams(format!("invalid endpoint {endpoint}: {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::InvalidParams(format!("endpoint {endpoint} has no host")))?;

    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok((endpoint.trim_end_matches('/').to_string(), host))
}
