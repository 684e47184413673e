/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::{ClientTlsContextConfig, ServerTlsContextConfig, TlsContextConfig};

const TICKET_KEY_FILE_MAX_SIZE: usize = 4096;

impl TlsContextConfig {
    fn set_by_yaml_kv(
        &mut self,
        k: &str,
        v: &Yaml,
        lookup_dir: Option<&Path>,
    ) -> anyhow::Result<()> {
        match gw_yaml::normalize_key(k).as_str() {
            "cipher_suites" | "ciphers" => {
                self.cipher_suites = gw_yaml::value::as_string(v)?;
                Ok(())
            }
            "ecdh_curves" | "curves" => {
                self.ecdh_curves = gw_yaml::value::as_string(v)?;
                Ok(())
            }
            "ca_cert_file" | "ca_certificate" => {
                let path = gw_yaml::value::as_file_path(v, lookup_dir)
                    .context(format!("invalid ca certificate file path value for key {k}"))?;
                self.ca_cert_file = Some(path);
                Ok(())
            }
            "cert_chain_file" | "certificate" => {
                let path = gw_yaml::value::as_file_path(v, lookup_dir)
                    .context(format!("invalid certificate chain file path value for key {k}"))?;
                self.cert_chain_file = Some(path);
                Ok(())
            }
            "private_key_file" | "private_key" => {
                let path = gw_yaml::value::as_file_path(v, lookup_dir)
                    .context(format!("invalid private key file path value for key {k}"))?;
                self.private_key_file = Some(path);
                Ok(())
            }
            "verify_subject_alt_name" => {
                self.verify_subject_alt_name = gw_yaml::value::as_list(v, gw_yaml::value::as_string)
                    .context(format!("invalid subject alt name list value for key {k}"))?;
                Ok(())
            }
            "verify_certificate_hash" => {
                self.verify_certificate_hash = gw_yaml::value::as_list(v, gw_yaml::value::as_string)
                    .context(format!("invalid certificate hash list value for key {k}"))?;
                Ok(())
            }
            "alpn_protocols" => {
                self.alpn_protocols = as_alpn_string(v)?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        }
    }
}

/// ALPN protocols may be written as a comma separated string or a list.
fn as_alpn_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::Array(_) => {
            let list = gw_yaml::value::as_list(v, gw_yaml::value::as_string)?;
            Ok(list.join(","))
        }
        _ => gw_yaml::value::as_string(v),
    }
}

impl ClientTlsContextConfig {
    pub fn parse_yaml(value: &Yaml, lookup_dir: Option<&Path>) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = ClientTlsContextConfig::default();
            gw_yaml::foreach_kv(map, |k, v| match gw_yaml::normalize_key(k).as_str() {
                "server_name_indication" | "sni" => {
                    config.server_name_indication = gw_yaml::value::as_string(v)?;
                    Ok(())
                }
                _ => config.common.set_by_yaml_kv(k, v, lookup_dir),
            })?;
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'client tls context config' should be 'map'"
            ))
        }
    }
}

impl ServerTlsContextConfig {
    pub fn parse_yaml(value: &Yaml, lookup_dir: Option<&Path>) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = ServerTlsContextConfig::default();
            gw_yaml::foreach_kv(map, |k, v| match gw_yaml::normalize_key(k).as_str() {
                "alt_alpn_protocols" => {
                    config.alt_alpn_protocols = as_alpn_string(v)?;
                    Ok(())
                }
                "alt_alpn_gate" => {
                    config.alt_alpn_gate = gw_yaml::value::as_string(v)?;
                    Ok(())
                }
                "require_client_certificate" => {
                    config.require_client_certificate = gw_yaml::value::as_bool(v)?;
                    Ok(())
                }
                "session_ticket_keys" | "session_ticket_key" => {
                    // the length is checked when the keyring is built
                    config.session_ticket_keys = gw_yaml::value::as_list(v, |v| {
                        gw_yaml::value::as_file_bytes(v, lookup_dir, TICKET_KEY_FILE_MAX_SIZE)
                    })
                    .context(format!("invalid session ticket key file list for key {k}"))?;
                    Ok(())
                }
                _ => config.common.set_by_yaml_kv(k, v, lookup_dir),
            })?;
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'server tls context config' should be 'map'"
            ))
        }
    }
}
