/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use log::debug;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::ssl::SslVerifyMode;
use openssl::stack::StackRef;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509, X509Ref, X509StoreContext, X509StoreContextRef};

use crate::{CertificateHashError, CertificateStore, TlsContextStats};

mod san;

const SHA256_DIGEST_LENGTH: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerifyMode {
    None,
    Peer,
    PeerAndRequireCert,
}

impl VerifyMode {
    pub fn ssl_verify_mode(&self) -> SslVerifyMode {
        match self {
            VerifyMode::None => SslVerifyMode::NONE,
            VerifyMode::Peer => SslVerifyMode::PEER,
            VerifyMode::PeerAndRequireCert => {
                SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT
            }
        }
    }
}

/// SHA-256 digest of the DER encoding of a certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CertificateHash([u8; SHA256_DIGEST_LENGTH]);

impl CertificateHash {
    pub fn compute(cert: &X509Ref) -> Result<Self, ErrorStack> {
        let digest = cert.digest(MessageDigest::sha256())?;
        let mut buf = [0u8; SHA256_DIGEST_LENGTH];
        buf.copy_from_slice(&digest);
        Ok(CertificateHash(buf))
    }
}

impl From<[u8; SHA256_DIGEST_LENGTH]> for CertificateHash {
    fn from(value: [u8; SHA256_DIGEST_LENGTH]) -> Self {
        CertificateHash(value)
    }
}

impl AsRef<[u8]> for CertificateHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for CertificateHash {
    type Err = CertificateHashError;

    /// Parse a hex string, with optional `:` delimiters like `AB:CD:...`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str: String = s.chars().filter(|c| *c != ':').collect();
        let bytes =
            hex::decode(&hex_str).map_err(|e| CertificateHashError::InvalidHex(s.to_string(), e))?;
        let buf = <[u8; SHA256_DIGEST_LENGTH]>::try_from(bytes.as_slice())
            .map_err(|_| CertificateHashError::InvalidLength(bytes.len()))?;
        Ok(CertificateHash(buf))
    }
}

impl fmt::Debug for CertificateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificateHash({})", hex::encode_upper(self.0))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    ChainValidation(String),
    SubjectAltName,
    CertificateHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyResult {
    Accept,
    Reject(RejectReason),
}

impl VerifyResult {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, VerifyResult::Accept)
    }
}

/// How the peer certificate is checked, built once per context.
pub struct VerificationPolicy {
    verify_mode: VerifyMode,
    san_allow_list: Vec<String>,
    hash_pins: Vec<CertificateHash>,
    trust_store: Option<X509Store>,
}

impl VerificationPolicy {
    /// `trust_anchors` holds the certificates of the CA file, if one is configured.
    pub fn new(
        trust_anchors: Option<Vec<X509>>,
        san_allow_list: Vec<String>,
        hash_pins: Vec<CertificateHash>,
    ) -> Result<Self, ErrorStack> {
        let mut verify_mode = VerifyMode::None;

        let trust_store = match trust_anchors {
            Some(certs) => {
                let mut builder = X509StoreBuilder::new()?;
                for cert in certs {
                    builder.add_cert(cert)?;
                }
                verify_mode = VerifyMode::Peer;
                Some(builder.build())
            }
            None => None,
        };

        if !san_allow_list.is_empty() || !hash_pins.is_empty() {
            verify_mode = VerifyMode::PeerAndRequireCert;
        }

        Ok(VerificationPolicy {
            verify_mode,
            san_allow_list,
            hash_pins,
            trust_store,
        })
    }

    #[inline]
    pub fn verify_mode(&self) -> VerifyMode {
        self.verify_mode
    }

    #[inline]
    pub fn san_allow_list(&self) -> &[String] {
        &self.san_allow_list
    }

    #[inline]
    pub fn hash_pins(&self) -> &[CertificateHash] {
        &self.hash_pins
    }

    /// Full verification of a peer chain: path validation against the
    /// configured CA, then the SAN allow list, then the hash pins.
    pub fn evaluate(
        &self,
        leaf: &X509Ref,
        chain: &StackRef<X509>,
        stats: &TlsContextStats,
    ) -> VerifyResult {
        if let Err(reason) = self.validate_chain(leaf, chain) {
            debug!("peer certificate chain validation failed: {reason}");
            stats.add_fail_verify_error();
            return VerifyResult::Reject(RejectReason::ChainValidation(reason));
        }

        self.verify_certificate(leaf, stats)
    }

    fn validate_chain(&self, leaf: &X509Ref, chain: &StackRef<X509>) -> Result<(), String> {
        let Some(store) = &self.trust_store else {
            return Err("no trusted CA certificate".to_string());
        };

        let mut store_ctx = X509StoreContext::new().map_err(|e| e.to_string())?;
        store_ctx
            .init(store, leaf, chain, |ctx| {
                if ctx.verify_cert()? {
                    Ok(Ok(()))
                } else {
                    Ok(Err(ctx.error().error_string().to_string()))
                }
            })
            .map_err(|e| e.to_string())?
    }

    /// The checks that run after the chain has been validated.
    pub fn verify_certificate(&self, leaf: &X509Ref, stats: &TlsContextStats) -> VerifyResult {
        if !self.san_allow_list.is_empty() && !self.verify_subject_alt_name(leaf) {
            stats.add_fail_verify_san();
            return VerifyResult::Reject(RejectReason::SubjectAltName);
        }

        if !self.hash_pins.is_empty() && !self.verify_certificate_hash(leaf) {
            stats.add_fail_verify_cert_hash();
            return VerifyResult::Reject(RejectReason::CertificateHash);
        }

        VerifyResult::Accept
    }

    fn verify_subject_alt_name(&self, leaf: &X509Ref) -> bool {
        let alt_names = CertificateStore::subject_alt_names(leaf);
        san::any_alt_name_match(&self.san_allow_list, &alt_names)
    }

    fn verify_certificate_hash(&self, leaf: &X509Ref) -> bool {
        match CertificateHash::compute(leaf) {
            Ok(hash) => self.hash_pins.contains(&hash),
            Err(e) => {
                debug!("failed to compute peer certificate digest: {e}");
                false
            }
        }
    }

    /// Verify callback installed into the TLS engine.
    ///
    /// The engine runs path validation itself and reports the result of each
    /// depth in `preverify_ok`; the leaf specific checks run at depth 0.
    pub(crate) fn engine_verify(
        &self,
        preverify_ok: bool,
        store_ctx: &mut X509StoreContextRef,
        stats: &TlsContextStats,
    ) -> bool {
        if !preverify_ok {
            debug!(
                "peer certificate chain validation failed at depth {}: {}",
                store_ctx.error_depth(),
                store_ctx.error().error_string()
            );
            stats.add_fail_verify_error();
            return false;
        }

        if store_ctx.error_depth() != 0 {
            return true;
        }

        match store_ctx.current_cert() {
            Some(leaf) => self.verify_certificate(leaf, stats).is_accepted(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::stack::Stack;

    use crate::test_util::*;

    fn ca_anchors() -> Option<Vec<X509>> {
        Some(vec![read_cert(CA_CERT)])
    }

    fn empty_chain() -> Stack<X509> {
        Stack::new().unwrap()
    }

    #[test]
    fn verify_mode_escalation() {
        let policy = VerificationPolicy::new(None, vec![], vec![]).unwrap();
        assert_eq!(policy.verify_mode(), VerifyMode::None);
        assert_eq!(policy.verify_mode().ssl_verify_mode(), SslVerifyMode::NONE);

        let policy = VerificationPolicy::new(ca_anchors(), vec![], vec![]).unwrap();
        assert_eq!(policy.verify_mode(), VerifyMode::Peer);

        let policy =
            VerificationPolicy::new(ca_anchors(), vec!["*.example.com".to_string()], vec![])
                .unwrap();
        assert_eq!(policy.verify_mode(), VerifyMode::PeerAndRequireCert);

        let policy = VerificationPolicy::new(None, vec![], vec![SERVER_CERT_SHA256.into()]).unwrap();
        assert_eq!(policy.verify_mode(), VerifyMode::PeerAndRequireCert);
        assert_eq!(
            policy.verify_mode().ssl_verify_mode(),
            SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT
        );
    }

    #[test]
    fn parse_hash() {
        let hash = CertificateHash::from_str(
            "9B:57:25:31:E0:AC:C4:27:7B:39:2E:78:93:6B:45:96:3B:49:D1:68:72:D6:B7:DF:CE:7A:A6:04:2D:36:FB:FD",
        )
        .unwrap();
        assert_eq!(hash, CertificateHash::from(SERVER_CERT_SHA256));

        let hash = CertificateHash::from_str(
            "9b572531e0acc4277b392e78936b45963b49d16872d6b7dfce7aa6042d36fbfd",
        )
        .unwrap();
        assert_eq!(hash.as_ref(), &SERVER_CERT_SHA256);

        assert!(matches!(
            CertificateHash::from_str("9B:57:ZZ"),
            Err(CertificateHashError::InvalidHex(..))
        ));
        assert!(matches!(
            CertificateHash::from_str("9B:57:25:31"),
            Err(CertificateHashError::InvalidLength(4))
        ));
    }

    #[test]
    fn hash_of_known_cert() {
        let leaf = read_cert(SERVER_CERT);
        let hash = CertificateHash::compute(&leaf).unwrap();
        assert_eq!(hash.as_ref(), &SERVER_CERT_SHA256);

        let mut der = leaf.to_der().unwrap();
        let last = der.len() - 1;
        der[last] ^= 0x01;
        let digest = openssl::hash::hash(MessageDigest::sha256(), &der).unwrap();
        assert_ne!(&*digest, &SERVER_CERT_SHA256);
    }

    #[test]
    fn accept_by_chain() {
        let stats = TlsContextStats::default();
        let policy = VerificationPolicy::new(ca_anchors(), vec![], vec![]).unwrap();
        let leaf = read_cert(SERVER_CERT);
        assert_eq!(
            policy.evaluate(&leaf, &empty_chain(), &stats),
            VerifyResult::Accept
        );
        assert_eq!(stats.snapshot().fail_verify_error, 0);
    }

    #[test]
    fn reject_by_chain() {
        let stats = TlsContextStats::default();
        let policy = VerificationPolicy::new(None, vec![], vec![SERVER_CERT_SHA256.into()]).unwrap();
        let leaf = read_cert(SERVER_CERT);
        let r = policy.evaluate(&leaf, &empty_chain(), &stats);
        assert!(matches!(
            r,
            VerifyResult::Reject(RejectReason::ChainValidation(_))
        ));

        // a leaf is not a trust anchor for itself
        let policy = VerificationPolicy::new(Some(vec![read_cert(OTHER_CERT)]), vec![], vec![])
            .unwrap();
        let r = policy.evaluate(&leaf, &empty_chain(), &stats);
        assert!(!r.is_accepted());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fail_verify_error, 2);
        assert_eq!(snapshot.fail_verify_san, 0);
        assert_eq!(snapshot.fail_verify_cert_hash, 0);
    }

    #[test]
    fn san_allow_list() {
        let stats = TlsContextStats::default();
        let leaf = read_cert(SERVER_CERT);

        let policy = VerificationPolicy::new(
            ca_anchors(),
            vec!["bar.example.com".to_string(), "*.example.com".to_string()],
            vec![],
        )
        .unwrap();
        assert!(policy.evaluate(&leaf, &empty_chain(), &stats).is_accepted());

        let policy = VerificationPolicy::new(
            ca_anchors(),
            vec!["spiffe://cluster.local/ns/default/sa/frontend".to_string()],
            vec![],
        )
        .unwrap();
        assert!(policy.evaluate(&leaf, &empty_chain(), &stats).is_accepted());

        // the chain is valid, but no SAN matches
        let policy =
            VerificationPolicy::new(ca_anchors(), vec!["example.com".to_string()], vec![])
                .unwrap();
        assert_eq!(
            policy.evaluate(&leaf, &empty_chain(), &stats),
            VerifyResult::Reject(RejectReason::SubjectAltName)
        );

        let other = read_cert(OTHER_CERT);
        let policy =
            VerificationPolicy::new(ca_anchors(), vec!["*.example.com".to_string()], vec![])
                .unwrap();
        assert_eq!(
            policy.evaluate(&other, &empty_chain(), &stats),
            VerifyResult::Reject(RejectReason::SubjectAltName)
        );

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fail_verify_error, 0);
        assert_eq!(snapshot.fail_verify_san, 2);
    }

    #[test]
    fn hash_pins() {
        let stats = TlsContextStats::default();
        let leaf = read_cert(SERVER_CERT);
        let other = read_cert(OTHER_CERT);

        let mut flipped = SERVER_CERT_SHA256;
        flipped[0] ^= 0x80;
        let policy = VerificationPolicy::new(
            ca_anchors(),
            vec![],
            vec![flipped.into(), SERVER_CERT_SHA256.into()],
        )
        .unwrap();
        assert!(policy.evaluate(&leaf, &empty_chain(), &stats).is_accepted());
        assert_eq!(
            policy.evaluate(&other, &empty_chain(), &stats),
            VerifyResult::Reject(RejectReason::CertificateHash)
        );

        let policy = VerificationPolicy::new(ca_anchors(), vec![], vec![flipped.into()]).unwrap();
        assert_eq!(
            policy.evaluate(&leaf, &empty_chain(), &stats),
            VerifyResult::Reject(RejectReason::CertificateHash)
        );
        assert_eq!(stats.snapshot().fail_verify_cert_hash, 2);
    }

    #[test]
    fn san_checked_before_hash() {
        let stats = TlsContextStats::default();
        let leaf = read_cert(SERVER_CERT);
        let mut flipped = SERVER_CERT_SHA256;
        flipped[31] ^= 0x01;
        let policy = VerificationPolicy::new(
            ca_anchors(),
            vec!["other.test".to_string()],
            vec![flipped.into()],
        )
        .unwrap();
        assert_eq!(
            policy.verify_certificate(&leaf, &stats),
            VerifyResult::Reject(RejectReason::SubjectAltName)
        );
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fail_verify_san, 1);
        assert_eq!(snapshot.fail_verify_cert_hash, 0);
    }
}
