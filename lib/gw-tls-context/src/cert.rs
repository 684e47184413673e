/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use openssl::asn1::Asn1Time;
use openssl::x509::{X509, X509Ref};

use crate::CertificateLoadError;

/// Subject alternative names that take part in peer verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubjectAltName {
    Dns(String),
    Uri(String),
}

/// Load every PEM encoded certificate found in `path`.
pub(crate) fn load_certificates(path: &Path) -> Result<Vec<X509>, CertificateLoadError> {
    let content = std::fs::read(path).map_err(|e| CertificateLoadError::Unreadable {
        path: path.to_path_buf(),
        source: e,
    })?;
    X509::stack_from_pem(&content).map_err(|e| CertificateLoadError::Malformed {
        path: path.to_path_buf(),
        source: e,
    })
}

pub struct LoadedCertificate {
    path: PathBuf,
    cert: X509,
}

impl LoadedCertificate {
    /// Load the first PEM encoded certificate found in `path`.
    pub fn load(path: &Path) -> Result<Self, CertificateLoadError> {
        let content = std::fs::read(path).map_err(|e| CertificateLoadError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let cert = X509::from_pem(&content).map_err(|e| CertificateLoadError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(LoadedCertificate {
            path: path.to_path_buf(),
            cert,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn cert(&self) -> &X509Ref {
        &self.cert
    }

    fn information(&self) -> String {
        format!(
            "Certificate Path: {}, Serial Number: {}, Days until Expiration: {}",
            self.path.display(),
            CertificateStore::serial_number(&self.cert),
            CertificateStore::days_until_expiration(Some(&self.cert)).max(0),
        )
    }
}

/// The CA certificate and the leaf of the certificate chain of a context.
#[derive(Default)]
pub struct CertificateStore {
    ca_cert: Option<LoadedCertificate>,
    cert_chain: Option<LoadedCertificate>,
}

impl CertificateStore {
    pub fn load(
        ca_cert_file: Option<&Path>,
        cert_chain_file: Option<&Path>,
    ) -> Result<Self, CertificateLoadError> {
        let ca_cert = ca_cert_file.map(LoadedCertificate::load).transpose()?;
        let cert_chain = cert_chain_file.map(LoadedCertificate::load).transpose()?;
        Ok(CertificateStore {
            ca_cert,
            cert_chain,
        })
    }

    #[inline]
    pub fn ca_cert(&self) -> Option<&LoadedCertificate> {
        self.ca_cert.as_ref()
    }

    #[inline]
    pub fn cert_chain(&self) -> Option<&LoadedCertificate> {
        self.cert_chain.as_ref()
    }

    /// Days left before `not_after`, negative if already expired.
    ///
    /// A missing certificate never expires, so `i32::MAX` is returned.
    pub fn days_until_expiration(cert: Option<&X509Ref>) -> i32 {
        let Some(cert) = cert else {
            return i32::MAX;
        };
        Asn1Time::days_from_now(0)
            .and_then(|now| now.diff(cert.not_after()))
            .map(|diff| diff.days)
            .unwrap_or(0)
    }

    pub fn days_until_first_expiry(ca_cert: Option<&X509Ref>, leaf_cert: Option<&X509Ref>) -> i32 {
        Self::days_until_expiration(ca_cert).min(Self::days_until_expiration(leaf_cert))
    }

    /// The external view of [`Self::days_until_first_expiry`], which never goes below zero.
    pub fn days_until_first_cert_expires(&self) -> u32 {
        let days = Self::days_until_first_expiry(
            self.ca_cert.as_ref().map(|c| c.cert()),
            self.cert_chain.as_ref().map(|c| c.cert()),
        );
        u32::try_from(days).unwrap_or(0)
    }

    /// Upper case hex string of the serial number, empty if it can't be encoded.
    pub fn serial_number(cert: &X509Ref) -> String {
        cert.serial_number()
            .to_bn()
            .and_then(|bn| bn.to_hex_str().map(|s| s.to_string()))
            .unwrap_or_default()
    }

    pub fn subject_alt_names(cert: &X509Ref) -> Vec<SubjectAltName> {
        let Some(names) = cert.subject_alt_names() else {
            return Vec::new();
        };
        let mut alt_names = Vec::with_capacity(names.len());
        for name in names.iter() {
            if let Some(dns) = name.dnsname() {
                alt_names.push(SubjectAltName::Dns(dns.to_string()));
            } else if let Some(uri) = name.uri() {
                alt_names.push(SubjectAltName::Uri(uri.to_string()));
            }
        }
        alt_names
    }

    pub fn ca_cert_information(&self) -> String {
        self.ca_cert
            .as_ref()
            .map(|c| c.information())
            .unwrap_or_default()
    }

    pub fn cert_chain_information(&self) -> String {
        self.cert_chain
            .as_ref()
            .map(|c| c.information())
            .unwrap_or_default()
    }
}
