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

//! Mapping challenge names onto zone-relative record names.

/// Strips the trailing dot(s) from a fully-qualified name.
pub fn un_fqdn(name: &str) -> &str {
    name.trim_end_matches('.')
}

/// Computes the zone-relative record name (RR) for a challenge FQDN.
///
/// `_acme-challenge.sub.example.com.` in zone `example.com.` resolves to
/// `_acme-challenge.sub`. When `zone` is not found in `fqdn` behind a dot, the
/// normalized `fqdn` comes back unchanged rather than failing; the following
/// record query then simply matches nothing.
// NOTE: the fallback can hide a solver configured against the wrong zone.
pub fn resolve_rr(fqdn: &str, zone: &str) -> String {
    let name = un_fqdn(fqdn);
    let needle = format!(".{}", un_fqdn(zone));
    match name.find(&needle) {
        Some(idx) => name[..idx].to_string(),
        None => name.to_string(),
    }
}
