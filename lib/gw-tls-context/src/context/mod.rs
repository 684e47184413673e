/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use openssl::error::ErrorStack;
use openssl::ssl::{Ssl, SslContext, SslRef, SslVerifyMode};
use openssl::stack::StackRef;
use openssl::x509::{X509, X509Ref};

use crate::{
    AlpnProtocolList, CertificateStore, HandshakeSummary, ServerAlpnSelector,
    SessionContextDigest, SessionTicketKeyring, TlsContextStats, VerificationPolicy, VerifyResult,
};

mod builder;
pub use builder::TlsContextBuilder;

#[derive(Debug)]
pub struct ClientPolicy {
    server_name_indication: String,
}

impl ClientPolicy {
    #[inline]
    pub fn server_name_indication(&self) -> Option<&str> {
        if self.server_name_indication.is_empty() {
            None
        } else {
            Some(&self.server_name_indication)
        }
    }
}

pub struct ServerPolicy {
    alpn_selector: Arc<ServerAlpnSelector>,
    session_ticket_keyring: Arc<SessionTicketKeyring>,
    require_client_certificate: bool,
}

impl ServerPolicy {
    #[inline]
    pub fn alpn_selector(&self) -> &ServerAlpnSelector {
        &self.alpn_selector
    }

    #[inline]
    pub fn session_ticket_keyring(&self) -> &SessionTicketKeyring {
        &self.session_ticket_keyring
    }

    #[inline]
    pub fn require_client_certificate(&self) -> bool {
        self.require_client_certificate
    }
}

pub enum ContextRole {
    Client(ClientPolicy),
    Server(ServerPolicy),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    /// In use for new connections.
    Ready,
    /// Replaced by a reload, only existing connections still hold it.
    Retired,
}

/// An immutable TLS policy, shared by every connection of a listener or
/// upstream cluster.
pub struct TlsContext {
    certificates: CertificateStore,
    verification: Arc<VerificationPolicy>,
    alpn_protocols: AlpnProtocolList,
    session_context: SessionContextDigest,
    stats: Arc<TlsContextStats>,
    verify_mode: SslVerifyMode,
    role: ContextRole,
    ssl_context: SslContext,
    retired: AtomicBool,
}

impl TlsContext {
    #[inline]
    pub fn role(&self) -> &ContextRole {
        &self.role
    }

    #[inline]
    pub fn is_server(&self) -> bool {
        matches!(self.role, ContextRole::Server(_))
    }

    #[inline]
    pub fn ssl_context(&self) -> &SslContext {
        &self.ssl_context
    }

    #[inline]
    pub fn certificates(&self) -> &CertificateStore {
        &self.certificates
    }

    #[inline]
    pub fn verification_policy(&self) -> &VerificationPolicy {
        &self.verification
    }

    /// The verify mode installed into the engine, which may be stronger than
    /// the one of the verification policy on the server side.
    #[inline]
    pub fn verify_mode(&self) -> SslVerifyMode {
        self.verify_mode
    }

    #[inline]
    pub fn alpn_protocols(&self) -> &AlpnProtocolList {
        &self.alpn_protocols
    }

    #[inline]
    pub fn session_context(&self) -> &SessionContextDigest {
        &self.session_context
    }

    #[inline]
    pub fn stats(&self) -> &Arc<TlsContextStats> {
        &self.stats
    }

    pub fn state(&self) -> ContextState {
        if self.retired.load(Ordering::Acquire) {
            ContextState::Retired
        } else {
            ContextState::Ready
        }
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    /// Create the per connection handle, with SNI set for clients.
    pub fn new_ssl(&self) -> Result<Ssl, ErrorStack> {
        let mut ssl = Ssl::new(&self.ssl_context)?;
        if let ContextRole::Client(client) = &self.role
            && let Some(name) = client.server_name_indication()
        {
            ssl.set_hostname(name)?;
        }
        Ok(ssl)
    }

    /// Check a peer chain against this context's verification policy.
    pub fn verify_peer(&self, leaf: &X509Ref, chain: &StackRef<X509>) -> VerifyResult {
        self.verification.evaluate(leaf, chain, &self.stats)
    }

    /// The protocol a server would pick for the client's offer, always
    /// `None` for clients.
    pub fn select_alpn<'a>(&self, client_offer: &'a [u8]) -> Option<&'a [u8]> {
        match &self.role {
            ContextRole::Client(_) => None,
            ContextRole::Server(server) => server.alpn_selector.select(client_offer),
        }
    }

    /// Update counters once the handshake on `ssl` has finished.
    pub fn record_handshake(&self, ssl: &SslRef) {
        self.stats
            .record_handshake(&HandshakeSummary::from_ssl(ssl));
    }

    #[inline]
    pub fn days_until_first_cert_expires(&self) -> u32 {
        self.certificates.days_until_first_cert_expires()
    }

    #[inline]
    pub fn ca_cert_information(&self) -> String {
        self.certificates.ca_cert_information()
    }

    #[inline]
    pub fn cert_chain_information(&self) -> String {
        self.certificates.cert_chain_information()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::stack::Stack;

    use crate::test_util::*;
    use crate::{
        ClientTlsContextConfig, RejectReason, RuntimeFeatures, ServerTlsContextConfig,
        TlsContextConfig, TlsContextError, VerifyMode,
    };

    fn builder() -> TlsContextBuilder {
        TlsContextBuilder::new(
            Arc::new(TlsContextStats::new("test")),
            Arc::new(RuntimeFeatures::default()),
        )
    }

    fn client_config() -> ClientTlsContextConfig {
        let mut common = TlsContextConfig::default();
        common.set_ca_cert_file(&data_path(CA_CERT));
        common.push_verify_subject_alt_name("*.example.com");
        common.set_alpn_protocols("h2,http/1.1");
        let mut config = ClientTlsContextConfig::new(common);
        config.set_server_name_indication("foo.example.com");
        config
    }

    fn server_config() -> ServerTlsContextConfig {
        let mut common = TlsContextConfig::default();
        common.set_cert_pair(&data_path(SERVER_CERT), &data_path(SERVER_KEY));
        common.set_alpn_protocols("h2,http/1.1");
        let mut config = ServerTlsContextConfig::new(common);
        config.set_alt_alpn_protocols("http/1.1");
        config.push_session_ticket_key(ticket_key_blob(0));
        config.push_session_ticket_key(ticket_key_blob(100));
        config
    }

    #[test]
    fn client_context() {
        let context = builder().build_client(&client_config()).unwrap();
        assert!(!context.is_server());
        assert_eq!(context.state(), ContextState::Ready);
        assert_eq!(
            context.verification_policy().verify_mode(),
            VerifyMode::PeerAndRequireCert
        );
        assert_eq!(
            context.alpn_protocols().wire_bytes(),
            b"\x02h2\x08http/1.1"
        );
        let ContextRole::Client(client) = context.role() else {
            panic!("not a client context");
        };
        assert_eq!(client.server_name_indication(), Some("foo.example.com"));
        assert_eq!(context.select_alpn(b"\x02h2"), None);

        assert!(context.new_ssl().is_ok());

        assert!(context.ca_cert_information().contains("Serial Number: 1A2B3C4D"));
        assert_eq!(context.cert_chain_information(), "");
        let days = context.days_until_first_cert_expires();
        assert!(days > 35000 && days < u32::MAX);
    }

    #[test]
    fn server_context() {
        let context = builder().build_server(&server_config()).unwrap();
        assert!(context.is_server());
        assert_eq!(context.verify_mode(), SslVerifyMode::NONE);
        assert_eq!(context.select_alpn(b"\x08http/1.1\x02h2"), Some(b"h2".as_slice()));
        assert_eq!(context.select_alpn(b"\x02h3"), None);

        let ContextRole::Server(server) = context.role() else {
            panic!("not a server context");
        };
        assert_eq!(server.session_ticket_keyring().len(), 2);
        assert_eq!(server.alpn_selector().gate_name(), "ssl.alt_alpn");
        assert!(!server.require_client_certificate());
        assert_eq!(context.ca_cert_information(), "");
        assert!(context.cert_chain_information().contains("Serial Number: 0BADF00D"));
    }

    #[test]
    fn server_require_client_certificate() {
        let mut config = server_config();
        config.common_mut().set_ca_cert_file(&data_path(CA_CERT));
        let context = builder().build_server(&config).unwrap();
        assert_eq!(context.verify_mode(), SslVerifyMode::PEER);

        config.set_require_client_certificate(true);
        let context = builder().build_server(&config).unwrap();
        assert_eq!(
            context.verify_mode(),
            SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT
        );
    }

    #[test]
    fn reject_san_mismatch_with_valid_chain() {
        let context = builder().build_client(&client_config()).unwrap();
        let chain: Stack<X509> = Stack::new().unwrap();

        let good = read_cert(SERVER_CERT);
        assert_eq!(context.verify_peer(&good, &chain), VerifyResult::Accept);

        let other = read_cert(OTHER_CERT);
        let no_san_context = builder()
            .build_client(&{
                let mut config = client_config();
                config.common_mut().verify_subject_alt_name.clear();
                config
            })
            .unwrap();
        assert_eq!(no_san_context.verify_peer(&other, &chain), VerifyResult::Accept);

        assert_eq!(
            context.verify_peer(&other, &chain),
            VerifyResult::Reject(RejectReason::SubjectAltName)
        );
        let snapshot = context.stats().snapshot();
        assert_eq!(snapshot.fail_verify_error, 0);
        assert_eq!(snapshot.fail_verify_san, 1);
    }

    #[test]
    fn session_context_binding() {
        let a = builder().build_client(&client_config()).unwrap();
        let b = builder().build_client(&client_config()).unwrap();
        assert_eq!(a.session_context(), b.session_context());

        let mut config = client_config();
        config.common_mut().push_verify_certificate_hash(&hex::encode(SERVER_CERT_SHA256));
        let c = builder().build_client(&config).unwrap();
        assert_ne!(a.session_context(), c.session_context());
    }

    #[test]
    fn construction_failures() {
        let mut config = client_config();
        config.common_mut().set_cipher_suites("NO-SUCH-CIPHER");
        assert!(matches!(
            builder().build_client(&config),
            Err(TlsContextError::CipherSuites { .. })
        ));

        let mut config = client_config();
        config.common_mut().set_ecdh_curves("no-such-curve");
        assert!(matches!(
            builder().build_client(&config),
            Err(TlsContextError::EcdhCurves { .. })
        ));

        let mut config = client_config();
        config.common_mut().set_ca_cert_file(&data_path(GARBAGE));
        assert!(matches!(
            builder().build_client(&config),
            Err(TlsContextError::Certificate(_))
        ));

        let mut config = client_config();
        config.common_mut().set_alpn_protocols("h2,,http/1.1");
        assert!(matches!(
            builder().build_client(&config),
            Err(TlsContextError::Alpn(_))
        ));

        let mut config = client_config();
        config.common_mut().push_verify_certificate_hash("9B:57");
        assert!(matches!(
            builder().build_client(&config),
            Err(TlsContextError::CertificateHash(_))
        ));

        let mut config = server_config();
        config.push_session_ticket_key(vec![0u8; 79]);
        let e = builder().build_server(&config).err().unwrap();
        assert!(matches!(
            e,
            TlsContextError::TicketKey(crate::TicketKeyError::InvalidLength { index: 2, .. })
        ));

        let mut config = server_config();
        config.set_alt_alpn_protocols(&"a".repeat(300));
        assert!(matches!(
            builder().build_server(&config),
            Err(TlsContextError::Alpn(_))
        ));

        let mut config = server_config();
        config
            .common_mut()
            .set_cert_pair(&data_path(SERVER_CERT), &data_path(OTHER_KEY));
        assert!(matches!(
            builder().build_server(&config),
            Err(TlsContextError::PrivateKey { .. })
        ));

        let mut config = server_config();
        config.common_mut().private_key_file = None;
        assert!(matches!(
            builder().build_server(&config),
            Err(TlsContextError::MissingPrivateKey(_))
        ));
    }

    #[test]
    fn retire() {
        let context = builder().build_server(&server_config()).unwrap();
        context.retire();
        assert_eq!(context.state(), ContextState::Retired);
        assert!(context.new_ssl().is_ok());
    }
}
