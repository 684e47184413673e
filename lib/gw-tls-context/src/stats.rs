/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use openssl::ssl::SslRef;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsContextStatsSnapshot {
    pub handshake: u64,
    pub session_reused: u64,
    pub no_certificate: u64,
    pub fail_verify_error: u64,
    pub fail_verify_san: u64,
    pub fail_verify_cert_hash: u64,
    pub ciphers: BTreeMap<String, u64>,
}

/// Counters shared by all connections of one or more TLS contexts.
#[derive(Debug, Default)]
pub struct TlsContextStats {
    name: String,

    handshake: AtomicU64,
    session_reused: AtomicU64,
    no_certificate: AtomicU64,
    fail_verify_error: AtomicU64,
    fail_verify_san: AtomicU64,
    fail_verify_cert_hash: AtomicU64,
    ciphers: RwLock<AHashMap<String, AtomicU64>>,
}

impl TlsContextStats {
    pub fn new(name: &str) -> Self {
        TlsContextStats {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_handshake(&self) {
        self.handshake.fetch_add(1, Ordering::Relaxed);
    }
    pub fn handshake(&self) -> u64 {
        self.handshake.load(Ordering::Relaxed)
    }

    pub fn add_session_reused(&self) {
        self.session_reused.fetch_add(1, Ordering::Relaxed);
    }
    pub fn session_reused(&self) -> u64 {
        self.session_reused.load(Ordering::Relaxed)
    }

    pub fn add_no_certificate(&self) {
        self.no_certificate.fetch_add(1, Ordering::Relaxed);
    }
    pub fn no_certificate(&self) -> u64 {
        self.no_certificate.load(Ordering::Relaxed)
    }

    pub fn add_fail_verify_error(&self) {
        self.fail_verify_error.fetch_add(1, Ordering::Relaxed);
    }
    pub fn fail_verify_error(&self) -> u64 {
        self.fail_verify_error.load(Ordering::Relaxed)
    }

    pub fn add_fail_verify_san(&self) {
        self.fail_verify_san.fetch_add(1, Ordering::Relaxed);
    }
    pub fn fail_verify_san(&self) -> u64 {
        self.fail_verify_san.load(Ordering::Relaxed)
    }

    pub fn add_fail_verify_cert_hash(&self) {
        self.fail_verify_cert_hash.fetch_add(1, Ordering::Relaxed);
    }
    pub fn fail_verify_cert_hash(&self) -> u64 {
        self.fail_verify_cert_hash.load(Ordering::Relaxed)
    }

    pub fn add_cipher(&self, cipher: &str) {
        {
            let map = self.ciphers.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = map.get(cipher) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        let mut map = self.ciphers.write().unwrap_or_else(|e| e.into_inner());
        map.entry(cipher.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }
    pub fn cipher(&self, cipher: &str) -> u64 {
        let map = self.ciphers.read().unwrap_or_else(|e| e.into_inner());
        map.get(cipher)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    pub fn record_handshake(&self, summary: &HandshakeSummary) {
        self.add_handshake();
        if summary.session_reused {
            self.add_session_reused();
        }
        if let Some(cipher) = &summary.cipher {
            self.add_cipher(cipher);
        }
        if !summary.peer_certificate {
            self.add_no_certificate();
        }
    }

    pub fn snapshot(&self) -> TlsContextStatsSnapshot {
        let ciphers = {
            let map = self.ciphers.read().unwrap_or_else(|e| e.into_inner());
            map.iter()
                .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
                .collect()
        };
        TlsContextStatsSnapshot {
            handshake: self.handshake(),
            session_reused: self.session_reused(),
            no_certificate: self.no_certificate(),
            fail_verify_error: self.fail_verify_error(),
            fail_verify_san: self.fail_verify_san(),
            fail_verify_cert_hash: self.fail_verify_cert_hash(),
            ciphers,
        }
    }
}

/// Facts about a finished handshake that feed the counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeSummary {
    pub session_reused: bool,
    pub cipher: Option<String>,
    pub peer_certificate: bool,
}

impl HandshakeSummary {
    pub fn from_ssl(ssl: &SslRef) -> Self {
        HandshakeSummary {
            session_reused: ssl.session_reused(),
            cipher: ssl.current_cipher().map(|c| c.name().to_string()),
            peer_certificate: ssl.peer_certificate().is_some(),
        }
    }
}
