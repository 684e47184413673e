/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_CIPHER_SUITES: &str = "ECDHE-ECDSA-AES128-GCM-SHA256:ECDHE-RSA-AES128-GCM-SHA256:\
    ECDHE-ECDSA-AES256-GCM-SHA384:ECDHE-RSA-AES256-GCM-SHA384:\
    ECDHE-ECDSA-CHACHA20-POLY1305:ECDHE-RSA-CHACHA20-POLY1305";
const DEFAULT_ECDH_CURVES: &str = "X25519:P-256";
const DEFAULT_ALT_ALPN_GATE: &str = "ssl.alt_alpn";

/// Settings shared by client and server contexts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsContextConfig {
    pub(crate) cipher_suites: String,
    pub(crate) ecdh_curves: String,
    pub(crate) ca_cert_file: Option<PathBuf>,
    pub(crate) cert_chain_file: Option<PathBuf>,
    pub(crate) private_key_file: Option<PathBuf>,
    pub(crate) verify_subject_alt_name: Vec<String>,
    pub(crate) verify_certificate_hash: Vec<String>,
    pub(crate) alpn_protocols: String,
}

impl Default for TlsContextConfig {
    fn default() -> Self {
        TlsContextConfig {
            cipher_suites: DEFAULT_CIPHER_SUITES.to_string(),
            ecdh_curves: DEFAULT_ECDH_CURVES.to_string(),
            ca_cert_file: None,
            cert_chain_file: None,
            private_key_file: None,
            verify_subject_alt_name: Vec::new(),
            verify_certificate_hash: Vec::new(),
            alpn_protocols: String::new(),
        }
    }
}

impl TlsContextConfig {
    pub fn set_cipher_suites(&mut self, list: &str) {
        self.cipher_suites = list.to_string();
    }

    pub fn set_ecdh_curves(&mut self, list: &str) {
        self.ecdh_curves = list.to_string();
    }

    pub fn set_ca_cert_file(&mut self, path: &Path) {
        self.ca_cert_file = Some(path.to_path_buf());
    }

    pub fn set_cert_pair(&mut self, cert_chain_file: &Path, private_key_file: &Path) {
        self.cert_chain_file = Some(cert_chain_file.to_path_buf());
        self.private_key_file = Some(private_key_file.to_path_buf());
    }

    pub fn push_verify_subject_alt_name(&mut self, matcher: &str) {
        self.verify_subject_alt_name.push(matcher.to_string());
    }

    /// Add a SHA-256 pin written as hex, with optional `:` delimiters.
    pub fn push_verify_certificate_hash(&mut self, hash: &str) {
        self.verify_certificate_hash.push(hash.to_string());
    }

    pub fn set_alpn_protocols(&mut self, protocols: &str) {
        self.alpn_protocols = protocols.to_string();
    }

    #[inline]
    pub fn ca_cert_file(&self) -> Option<&Path> {
        self.ca_cert_file.as_deref()
    }

    #[inline]
    pub fn cert_chain_file(&self) -> Option<&Path> {
        self.cert_chain_file.as_deref()
    }

    #[inline]
    pub fn private_key_file(&self) -> Option<&Path> {
        self.private_key_file.as_deref()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientTlsContextConfig {
    pub(crate) common: TlsContextConfig,
    pub(crate) server_name_indication: String,
}

impl ClientTlsContextConfig {
    pub fn new(common: TlsContextConfig) -> Self {
        ClientTlsContextConfig {
            common,
            server_name_indication: String::new(),
        }
    }

    #[inline]
    pub fn common(&self) -> &TlsContextConfig {
        &self.common
    }

    #[inline]
    pub fn common_mut(&mut self) -> &mut TlsContextConfig {
        &mut self.common
    }

    pub fn set_server_name_indication(&mut self, name: &str) {
        self.server_name_indication = name.to_string();
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerTlsContextConfig {
    pub(crate) common: TlsContextConfig,
    pub(crate) alt_alpn_protocols: String,
    pub(crate) alt_alpn_gate: String,
    pub(crate) require_client_certificate: bool,
    pub(crate) session_ticket_keys: Vec<Vec<u8>>,
}

impl Default for ServerTlsContextConfig {
    fn default() -> Self {
        ServerTlsContextConfig::new(TlsContextConfig::default())
    }
}

impl ServerTlsContextConfig {
    pub fn new(common: TlsContextConfig) -> Self {
        ServerTlsContextConfig {
            common,
            alt_alpn_protocols: String::new(),
            alt_alpn_gate: DEFAULT_ALT_ALPN_GATE.to_string(),
            require_client_certificate: false,
            session_ticket_keys: Vec::new(),
        }
    }

    #[inline]
    pub fn common(&self) -> &TlsContextConfig {
        &self.common
    }

    #[inline]
    pub fn common_mut(&mut self) -> &mut TlsContextConfig {
        &mut self.common
    }

    pub fn set_alt_alpn_protocols(&mut self, protocols: &str) {
        self.alt_alpn_protocols = protocols.to_string();
    }

    pub fn set_alt_alpn_gate(&mut self, name: &str) {
        self.alt_alpn_gate = name.to_string();
    }

    pub fn set_require_client_certificate(&mut self, require: bool) {
        self.require_client_certificate = require;
    }

    /// Append a raw key blob, the first one added is the active key.
    pub fn push_session_ticket_key(&mut self, blob: Vec<u8>) {
        self.session_ticket_keys.push(blob);
    }
}
