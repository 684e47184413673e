/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use crate::SubjectAltName;

/// Match a DNS name found in the peer certificate against a configured matcher.
///
/// A matcher like `*.example.com` is compared as a suffix, so it accepts any
/// name that ends with `.example.com` and has at least one more byte in front,
/// including names with more than one extra label.
pub(crate) fn dns_name_match(matcher: &str, candidate: &str) -> bool {
    if matcher == candidate {
        return true;
    }

    if let Some(suffix) = matcher.strip_prefix('*') {
        if suffix.starts_with('.') && candidate.len() > suffix.len() {
            return candidate.as_bytes().ends_with(suffix.as_bytes());
        }
    }

    false
}

#[inline]
pub(crate) fn uri_match(matcher: &str, candidate: &str) -> bool {
    matcher.as_bytes() == candidate.as_bytes()
}

pub(crate) fn any_alt_name_match(matchers: &[String], alt_names: &[SubjectAltName]) -> bool {
    alt_names.iter().any(|name| match name {
        SubjectAltName::Dns(dns) => matchers.iter().any(|m| dns_name_match(m, dns)),
        SubjectAltName::Uri(uri) => matchers.iter().any(|m| uri_match(m, uri)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dns_exact() {
        assert!(dns_name_match("example.com", "example.com"));
        assert!(!dns_name_match("example.com", "foo.example.com"));
        assert!(!dns_name_match("example.com", "example.co"));
    }

    #[test]
    fn dns_wildcard() {
        assert!(dns_name_match("*.example.com", "foo.example.com"));
        assert!(!dns_name_match("*.example.com", "example.com"));
        assert!(!dns_name_match("*.example.com", ".example.com"));
        assert!(!dns_name_match("*.example.com", "fooexample.com"));
        assert!(!dns_name_match("*.example.com", "foo.example.org"));
        // suffix comparison, not limited to a single label
        assert!(dns_name_match("*.example.com", "a.b.example.com"));
        // only a leading `*.` is a wildcard
        assert!(!dns_name_match("*example.com", "fooexample.com"));
        assert!(!dns_name_match("foo.*.com", "foo.example.com"));
    }

    #[test]
    fn uri_exact() {
        let uri = "spiffe://cluster.local/ns/default/sa/frontend";
        assert!(uri_match(uri, uri));
        assert!(!uri_match("spiffe://cluster.local/*", uri));
        assert!(!uri_match(&uri.to_uppercase(), uri));
    }

    #[test]
    fn any_match() {
        let names = vec![
            SubjectAltName::Dns("foo.example.com".to_string()),
            SubjectAltName::Uri("spiffe://cluster.local/ns/default/sa/frontend".to_string()),
        ];
        let matchers = vec!["bar.example.com".to_string(), "*.example.com".to_string()];
        assert!(any_alt_name_match(&matchers, &names));

        let matchers = vec!["spiffe://cluster.local/ns/default/sa/frontend".to_string()];
        assert!(any_alt_name_match(&matchers, &names));

        // URI names are never wildcard matched
        let names = vec![SubjectAltName::Uri("foo.example.com".to_string())];
        let matchers = vec!["*.example.com".to_string()];
        assert!(!any_alt_name_match(&matchers, &names));

        assert!(!any_alt_name_match(&matchers, &[]));
    }
}
