/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::{
    AlpnConfigError, CertificateHashError, CertificateLoadError, TicketKeyError, TlsContextError,
};

mod cert;
pub use cert::{CertificateStore, LoadedCertificate, SubjectAltName};

mod verify;
pub use verify::{CertificateHash, RejectReason, VerificationPolicy, VerifyMode, VerifyResult};

mod alpn;
pub use alpn::{AlpnProtocolList, ServerAlpnSelector, WireProtocolIter};

mod gate;
pub use gate::{FeatureGate, RuntimeFeatures};

mod ticket;
pub use ticket::{
    SESSION_TICKET_KEY_LENGTH, SessionTicketKey, SessionTicketKeyring, TicketDecryptStatus,
};

mod session;
pub use session::SessionContextDigest;

mod stats;
pub use stats::{HandshakeSummary, TlsContextStats, TlsContextStatsSnapshot};

mod config;
pub use config::{ClientTlsContextConfig, ServerTlsContextConfig, TlsContextConfig};

mod context;
pub use context::{
    ClientPolicy, ContextRole, ContextState, ServerPolicy, TlsContext, TlsContextBuilder,
};

mod manager;
pub use manager::TlsContextManager;

#[cfg(test)]
mod test_util;
