/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt::{self, Write};

use gw_tls_context::{AlpnProtocolList, ContextRole, TlsContext};

fn alpn_text(list: &AlpnProtocolList) -> String {
    list.iter()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn or_none(s: String) -> String {
    if s.is_empty() { "<none>".to_string() } else { s }
}

/// Render the summary of a loaded context as indented text lines.
pub fn context_summary(name: &str, context: &TlsContext) -> String {
    let mut s = String::new();
    // writing into a String never fails
    let _ = write_summary(&mut s, name, context);
    s
}

fn write_summary(s: &mut String, name: &str, context: &TlsContext) -> fmt::Result {
    let role = if context.is_server() { "server" } else { "client" };
    writeln!(s, "{name} ({role})")?;
    writeln!(s, "  ca cert: {}", or_none(context.ca_cert_information()))?;
    writeln!(s, "  cert chain: {}", or_none(context.cert_chain_information()))?;
    writeln!(
        s,
        "  verify mode: {:?}",
        context.verification_policy().verify_mode()
    )?;
    writeln!(s, "  alpn: {}", or_none(alpn_text(context.alpn_protocols())))?;
    match context.role() {
        ContextRole::Client(policy) => {
            if let Some(sni) = policy.server_name_indication() {
                writeln!(s, "  sni: {sni}")?;
            }
        }
        ContextRole::Server(policy) => {
            let selector = policy.alpn_selector();
            writeln!(
                s,
                "  alt alpn: {} (gate {}, {})",
                or_none(alpn_text(selector.alternate())),
                selector.gate_name(),
                if selector.gate_enabled() { "on" } else { "off" }
            )?;
            writeln!(
                s,
                "  require client certificate: {}",
                policy.require_client_certificate()
            )?;
            writeln!(
                s,
                "  session ticket keys: {}",
                policy.session_ticket_keyring().len()
            )?;
        }
    }
    writeln!(s, "  session context: {:?}", context.session_context())?;
    writeln!(
        s,
        "  days until first cert expires: {}",
        context.days_until_first_cert_expires()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use gw_tls_context::{
        RuntimeFeatures, ServerTlsContextConfig, TlsContextBuilder, TlsContextConfig,
        TlsContextStats,
    };

    fn data_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../lib/gw-tls-context/tests/data")
            .join(name)
    }

    #[test]
    fn server_summary() {
        let mut common = TlsContextConfig::default();
        common.set_cert_pair(&data_path("server-cert.pem"), &data_path("server-key.pem"));
        common.set_alpn_protocols("h2,http/1.1");
        let mut config = ServerTlsContextConfig::new(common);
        config.push_session_ticket_key(std::fs::read(data_path("ticket-key-0.bin")).unwrap());

        let features = Arc::new(RuntimeFeatures::default());
        let context = TlsContextBuilder::new(Arc::new(TlsContextStats::new("test")), features.clone())
        .build_server(&config)
        .unwrap();

        let text = context_summary("frontend", &context);
        assert!(text.starts_with("frontend (server)\n"));
        assert!(text.contains("  ca cert: <none>\n"));
        assert!(text.contains("Serial Number: 0BADF00D"));
        assert!(text.contains("  alpn: h2,http/1.1\n"));
        assert!(text.contains("  alt alpn: <none> (gate ssl.alt_alpn, off)\n"));
        assert!(text.contains("  session ticket keys: 1\n"));

        features.enable("ssl.alt_alpn");
        let text = context_summary("frontend", &context);
        assert!(text.contains("  alt alpn: <none> (gate ssl.alt_alpn, on)\n"));
    }
}
