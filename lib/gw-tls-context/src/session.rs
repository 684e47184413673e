/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use openssl::error::ErrorStack;
use openssl::hash::{Hasher, MessageDigest};
use openssl::x509::X509Ref;

use crate::CertificateHash;

const SESSION_CONTEXT_SEED: &[u8] = b"gw-tls";
const SESSION_CONTEXT_LENGTH: usize = 32;

/// Binds resumed sessions to the peer verification settings of a context.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SessionContextDigest([u8; SESSION_CONTEXT_LENGTH]);

impl SessionContextDigest {
    /// The seed is always hashed first, so there is a stable value even
    /// when nothing else is configured.
    pub fn compute(
        ca_cert: Option<&X509Ref>,
        san_allow_list: &[String],
        hash_pins: &[CertificateHash],
    ) -> Result<Self, ErrorStack> {
        let mut hasher = Hasher::new(MessageDigest::sha256())?;
        hasher.update(SESSION_CONTEXT_SEED)?;

        if let Some(cert) = ca_cert {
            let cert_digest = cert.digest(MessageDigest::sha256())?;
            hasher.update(cert_digest.as_ref())?;
        }
        for name in san_allow_list {
            hasher.update(name.as_bytes())?;
        }
        for pin in hash_pins {
            hasher.update(pin.as_ref())?;
        }

        let digest = hasher.finish()?;
        let mut buf = [0u8; SESSION_CONTEXT_LENGTH];
        buf.copy_from_slice(&digest);
        Ok(SessionContextDigest(buf))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionContextDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionContextDigest({})", hex::encode(self.0))
    }
}
