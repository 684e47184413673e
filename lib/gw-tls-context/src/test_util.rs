/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use openssl::x509::X509;

pub(crate) const CA_CERT: &str = "ca-cert.pem";
pub(crate) const SERVER_CERT: &str = "server-cert.pem";
pub(crate) const SERVER_KEY: &str = "server-key.pem";
pub(crate) const OTHER_CERT: &str = "other-cert.pem";
pub(crate) const OTHER_KEY: &str = "other-key.pem";
pub(crate) const GARBAGE: &str = "garbage.pem";
/// Signed by the test CA, valid from 2020-01-01 to 2021-01-01.
pub(crate) const EXPIRED_CERT: &str = "expired-cert.pem";

/// SHA-256 of the DER encoding of `server-cert.pem`.
pub(crate) const SERVER_CERT_SHA256: [u8; 32] = hex_literal::hex!(
    "9B572531E0ACC4277B392E78936B45963B49D16872D6B7DFCE7AA6042D36FBFD"
);

pub(crate) fn data_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("data");
    path.push(name);
    path
}

pub(crate) fn read_cert(name: &str) -> X509 {
    let content = std::fs::read(data_path(name)).unwrap();
    X509::from_pem(&content).unwrap()
}

pub(crate) fn ticket_key_blob(seed: u8) -> Vec<u8> {
    (0..80u8).map(|i| i.wrapping_add(seed)).collect()
}
