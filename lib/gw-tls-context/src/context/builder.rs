/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use log::debug;
use openssl::ssl::{
    AlpnError, SslContext, SslContextBuilder, SslFiletype, SslMethod, SslOptions, SslRef,
    SslVerifyMode,
};
use openssl::x509::X509Name;

use super::{ClientPolicy, ContextRole, ServerPolicy, TlsContext};
use crate::cert::load_certificates;
use crate::{
    AlpnProtocolList, CertificateHash, CertificateStore, ClientTlsContextConfig, FeatureGate,
    ServerAlpnSelector, ServerTlsContextConfig, SessionContextDigest, SessionTicketKeyring,
    TlsContextConfig, TlsContextError, TlsContextStats, VerificationPolicy, VerifyMode,
};

/// The validated parts shared by both roles.
struct CommonParts {
    certificates: CertificateStore,
    verification: Arc<VerificationPolicy>,
    alpn_protocols: AlpnProtocolList,
    session_context: SessionContextDigest,
}

impl CommonParts {
    fn build(config: &TlsContextConfig) -> Result<Self, TlsContextError> {
        let hash_pins = config
            .verify_certificate_hash
            .iter()
            .map(|s| CertificateHash::from_str(s))
            .collect::<Result<Vec<_>, _>>()?;

        let certificates =
            CertificateStore::load(config.ca_cert_file(), config.cert_chain_file())?;
        let trust_anchors = config
            .ca_cert_file()
            .map(load_certificates)
            .transpose()?;

        let verification = VerificationPolicy::new(
            trust_anchors,
            config.verify_subject_alt_name.clone(),
            hash_pins,
        )
        .map_err(TlsContextError::engine("build verification trust store"))?;

        let alpn_protocols = AlpnProtocolList::encode(&config.alpn_protocols)?;

        let session_context = SessionContextDigest::compute(
            certificates.ca_cert().map(|c| c.cert()),
            verification.san_allow_list(),
            verification.hash_pins(),
        )
        .map_err(TlsContextError::engine("compute session id context"))?;

        Ok(CommonParts {
            certificates,
            verification: Arc::new(verification),
            alpn_protocols,
            session_context,
        })
    }
}

/// Builds contexts that report to the same stats and consult the same
/// feature gates.
pub struct TlsContextBuilder {
    stats: Arc<TlsContextStats>,
    features: Arc<dyn FeatureGate>,
}

impl TlsContextBuilder {
    pub fn new(stats: Arc<TlsContextStats>, features: Arc<dyn FeatureGate>) -> Self {
        TlsContextBuilder { stats, features }
    }

    #[inline]
    pub fn stats(&self) -> &Arc<TlsContextStats> {
        &self.stats
    }

    pub fn build_client(
        &self,
        config: &ClientTlsContextConfig,
    ) -> Result<TlsContext, TlsContextError> {
        let parts = CommonParts::build(&config.common)?;
        let verify_mode = parts.verification.verify_mode().ssl_verify_mode();

        let mut builder = self.new_engine_builder(&config.common, &parts, verify_mode)?;
        if !parts.alpn_protocols.is_empty() {
            builder
                .set_alpn_protos(parts.alpn_protocols.wire_bytes())
                .map_err(TlsContextError::engine("set ALPN protocols"))?;
        }
        let ssl_context = builder.build();

        debug!(
            "client tls context built, verify mode {:?}",
            parts.verification.verify_mode()
        );
        Ok(self.assemble(
            parts,
            verify_mode,
            ContextRole::Client(ClientPolicy {
                server_name_indication: config.server_name_indication.clone(),
            }),
            ssl_context,
        ))
    }

    pub fn build_server(
        &self,
        config: &ServerTlsContextConfig,
    ) -> Result<TlsContext, TlsContextError> {
        let parts = CommonParts::build(&config.common)?;

        let alt_alpn_protocols = AlpnProtocolList::encode(&config.alt_alpn_protocols)?;
        let session_ticket_keyring =
            Arc::new(SessionTicketKeyring::new(&config.session_ticket_keys)?);

        let mut verify_mode = parts.verification.verify_mode().ssl_verify_mode();
        let client_ca_list = match config.common.ca_cert_file() {
            Some(path) => {
                let list = X509Name::load_client_ca_file(path).map_err(|e| {
                    TlsContextError::ClientCaFile {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    }
                })?;
                if config.require_client_certificate {
                    verify_mode = SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT;
                }
                Some(list)
            }
            None => None,
        };

        let mut builder = self.new_engine_builder(&config.common, &parts, verify_mode)?;
        if let Some(list) = client_ca_list {
            builder.set_client_ca_list(list);
        }

        let alpn_selector = Arc::new(ServerAlpnSelector::new(
            parts.alpn_protocols.clone(),
            alt_alpn_protocols,
            self.features.clone(),
            config.alt_alpn_gate.clone(),
        ));
        if !parts.alpn_protocols.is_empty() {
            let selector = alpn_selector.clone();
            builder.set_alpn_select_callback(move |_ssl: &mut SslRef, client: &[u8]| {
                selector.select(client).ok_or(AlpnError::NOACK)
            });
        }

        if !session_ticket_keyring.is_empty() {
            let keyring = session_ticket_keyring.clone();
            builder
                .set_ticket_key_callback(
                    move |_ssl, key_name, iv, cipher_ctx, hmac_ctx, encrypt| {
                        Ok(keyring.process(key_name, iv, cipher_ctx, hmac_ctx, encrypt))
                    },
                )
                .map_err(TlsContextError::engine("set session ticket key callback"))?;
        }

        builder
            .set_session_id_context(parts.session_context.as_bytes())
            .map_err(TlsContextError::engine("set session id context"))?;
        let ssl_context = builder.build();

        debug!(
            "server tls context built, verify mode {:?}, {} session ticket keys",
            parts.verification.verify_mode(),
            session_ticket_keyring.len()
        );
        Ok(self.assemble(
            parts,
            verify_mode,
            ContextRole::Server(ServerPolicy {
                alpn_selector,
                session_ticket_keyring,
                require_client_certificate: config.require_client_certificate,
            }),
            ssl_context,
        ))
    }

    fn new_engine_builder(
        &self,
        config: &TlsContextConfig,
        parts: &CommonParts,
        verify_mode: SslVerifyMode,
    ) -> Result<SslContextBuilder, TlsContextError> {
        let mut builder = SslContext::builder(SslMethod::tls())
            .map_err(TlsContextError::engine("create ssl context builder"))?;

        builder
            .set_cipher_list(&config.cipher_suites)
            .map_err(|source| TlsContextError::CipherSuites {
                list: config.cipher_suites.clone(),
                source,
            })?;
        builder
            .set_groups_list(&config.ecdh_curves)
            .map_err(|source| TlsContextError::EcdhCurves {
                list: config.ecdh_curves.clone(),
                source,
            })?;

        if let Some(path) = config.ca_cert_file() {
            builder
                .set_ca_file(path)
                .map_err(|source| TlsContextError::VerifyLocations {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        if parts.verification.verify_mode() != VerifyMode::None {
            let verification = parts.verification.clone();
            let stats = self.stats.clone();
            builder.set_verify_callback(verify_mode, move |preverify_ok, store_ctx| {
                verification.engine_verify(preverify_ok, store_ctx, &stats)
            });
        } else {
            builder.set_verify(verify_mode);
        }

        if let Some(chain_path) = config.cert_chain_file() {
            builder
                .set_certificate_chain_file(chain_path)
                .map_err(|source| TlsContextError::CertificateChain {
                    path: chain_path.to_path_buf(),
                    source,
                })?;

            let key_path = config
                .private_key_file()
                .ok_or_else(|| TlsContextError::MissingPrivateKey(chain_path.to_path_buf()))?;
            builder
                .set_private_key_file(key_path, SslFiletype::PEM)
                .map_err(|e| TlsContextError::PrivateKey {
                    path: key_path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            builder
                .check_private_key()
                .map_err(|e| TlsContextError::PrivateKey {
                    path: key_path.to_path_buf(),
                    reason: format!("mismatch with certificate chain: {e}"),
                })?;
        }

        builder.set_options(SslOptions::NO_SSLV3 | SslOptions::CIPHER_SERVER_PREFERENCE);
        Ok(builder)
    }

    fn assemble(
        &self,
        parts: CommonParts,
        verify_mode: SslVerifyMode,
        role: ContextRole,
        ssl_context: SslContext,
    ) -> TlsContext {
        TlsContext {
            certificates: parts.certificates,
            verification: parts.verification,
            alpn_protocols: parts.alpn_protocols,
            session_context: parts.session_context,
            stats: self.stats.clone(),
            verify_mode,
            role,
            ssl_context,
            retired: AtomicBool::new(false),
        }
    }
}
