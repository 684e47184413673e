/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::PathBuf;

use openssl::error::ErrorStack;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertificateLoadError {
    #[error("failed to read certificate file {}: {source}", .path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("failed to load certificate '{}': {source}", .path.display())]
    Malformed { path: PathBuf, source: ErrorStack },
}

#[derive(Debug, Error)]
pub enum AlpnConfigError {
    #[error("invalid ALPN protocol string: protocol #{index} has length {length}, at most 255")]
    NameTooLong { index: usize, length: usize },
    #[error("invalid ALPN protocol string: protocol #{0} is empty")]
    EmptyName(usize),
    #[error("invalid ALPN protocol string: encoded length {0} reaches the 65535 limit")]
    ListTooLong(usize),
}

#[derive(Debug, Error)]
pub enum TicketKeyError {
    #[error(
        "incorrect TLS session ticket key length. Index {index}, length {length}, expected length {expected}."
    )]
    InvalidLength {
        index: usize,
        length: usize,
        expected: usize,
    },
    #[error("no session ticket key configured")]
    EmptyKeyring,
    #[error("invalid ticket key name buffer length {0}")]
    InvalidNameBuffer(usize),
    #[error("invalid ticket IV buffer length {0}")]
    InvalidIvBuffer(usize),
    #[error("ticket crypto context init failed: {0}")]
    Crypto(#[from] ErrorStack),
}

#[derive(Debug, Error)]
pub enum CertificateHashError {
    #[error("invalid hex string {0}: {1}")]
    InvalidHex(String, hex::FromHexError),
    #[error("invalid sha256 digest length {0}, expected 32")]
    InvalidLength(usize),
}

/// Errors that abort the construction of a TLS context.
#[derive(Debug, Error)]
pub enum TlsContextError {
    #[error("failed to initialize cipher suites {list}: {source}")]
    CipherSuites { list: String, source: ErrorStack },
    #[error("failed to initialize ECDH curves {list}: {source}")]
    EcdhCurves { list: String, source: ErrorStack },
    #[error(transparent)]
    Certificate(#[from] CertificateLoadError),
    #[error("failed to load verify locations file {}: {source}", .path.display())]
    VerifyLocations { path: PathBuf, source: ErrorStack },
    #[error("failed to load certificate chain file {}: {source}", .path.display())]
    CertificateChain { path: PathBuf, source: ErrorStack },
    #[error("no private key file configured for certificate chain {}", .0.display())]
    MissingPrivateKey(PathBuf),
    #[error("failed to load private key file {}: {reason}", .path.display())]
    PrivateKey { path: PathBuf, reason: String },
    #[error("failed to load client CA file {}: {reason}", .path.display())]
    ClientCaFile { path: PathBuf, reason: String },
    #[error(transparent)]
    Alpn(#[from] AlpnConfigError),
    #[error(transparent)]
    TicketKey(#[from] TicketKeyError),
    #[error(transparent)]
    CertificateHash(#[from] CertificateHashError),
    #[error("failed to {step}: {source}")]
    Engine {
        step: &'static str,
        source: ErrorStack,
    },
}

impl TlsContextError {
    pub(crate) fn engine(step: &'static str) -> impl FnOnce(ErrorStack) -> Self {
        move |source| TlsContextError::Engine { step, source }
    }
}
