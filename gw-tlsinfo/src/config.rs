/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

use gw_tls_context::{ClientTlsContextConfig, ServerTlsContextConfig, TlsContextManager};

pub enum ContextEntry {
    Client {
        name: String,
        config: ClientTlsContextConfig,
    },
    Server {
        name: String,
        config: ServerTlsContextConfig,
    },
}

impl ContextEntry {
    pub fn name(&self) -> &str {
        match self {
            ContextEntry::Client { name, .. } => name,
            ContextEntry::Server { name, .. } => name,
        }
    }

    pub fn load_into(&self, manager: &TlsContextManager) -> anyhow::Result<()> {
        match self {
            ContextEntry::Client { name, config } => manager.load_client(name, config)?,
            ContextEntry::Server { name, config } => manager.load_server(name, config)?,
        };
        Ok(())
    }

    fn parse_yaml(map: &yaml::Hash, lookup_dir: Option<&Path>) -> anyhow::Result<Self> {
        let name = gw_yaml::get_required(map, "name")
            .and_then(gw_yaml::value::as_string)
            .context("invalid tls context name")?;
        let role = gw_yaml::get_required(map, "role")
            .and_then(gw_yaml::value::as_string)
            .context(format!("invalid role for tls context {name}"))?;

        let mut rest = map.clone();
        rest.remove(&Yaml::String("name".to_string()));
        rest.remove(&Yaml::String("role".to_string()));
        let rest = Yaml::Hash(rest);

        match gw_yaml::normalize_key(&role).as_str() {
            "client" => {
                let config = ClientTlsContextConfig::parse_yaml(&rest, lookup_dir)
                    .context(format!("invalid client tls context {name}"))?;
                Ok(ContextEntry::Client { name, config })
            }
            "server" => {
                let config = ServerTlsContextConfig::parse_yaml(&rest, lookup_dir)
                    .context(format!("invalid server tls context {name}"))?;
                Ok(ContextEntry::Server { name, config })
            }
            _ => Err(anyhow!("unsupported role {role} for tls context {name}")),
        }
    }
}

#[derive(Default)]
pub struct TlsInfoConfig {
    pub features: Vec<String>,
    pub contexts: Vec<ContextEntry>,
}

impl TlsInfoConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let doc = gw_yaml::load_doc(path)?;
        TlsInfoConfig::parse_yaml(&doc, path.parent())
            .context(format!("failed to parse config file {}", path.display()))
    }

    fn parse_yaml(v: &Yaml, lookup_dir: Option<&Path>) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = v else {
            return Err(anyhow!("the root of the config file should be a map"));
        };

        let mut config = TlsInfoConfig::default();
        gw_yaml::foreach_kv(map, |k, v| match gw_yaml::normalize_key(k).as_str() {
            "features" => {
                config.features = gw_yaml::value::as_list(v, gw_yaml::value::as_string)
                    .context(format!("invalid feature list value for key {k}"))?;
                Ok(())
            }
            "contexts" => {
                config.contexts = gw_yaml::value::as_list(v, |v| match v {
                    Yaml::Hash(map) => ContextEntry::parse_yaml(map, lookup_dir),
                    _ => Err(anyhow!("tls context entry should be a map")),
                })?;
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use yaml_rust::YamlLoader;

    fn data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("lib")
            .join("gw-tls-context")
            .join("tests")
            .join("data")
    }

    macro_rules! yaml_doc {
        ($s:expr $(,)?) => {
            YamlLoader::load_from_str($s).unwrap().pop().unwrap()
        };
    }

    #[test]
    fn parse() {
        let dir = data_dir();
        let yaml = yaml_doc!(
            r#"
            features: [ssl.alt_alpn]
            contexts:
              - name: frontend
                role: server
                certificate: server-cert.pem
                private_key: server-key.pem
                alpn_protocols: h2,http/1.1
                session_ticket_keys: ticket-key-0.bin
              - name: backend
                role: client
                ca_cert_file: ca-cert.pem
                verify_subject_alt_name: "*.example.com"
            "#,
        );
        let config = TlsInfoConfig::parse_yaml(&yaml, Some(&dir)).unwrap();
        assert_eq!(config.features, vec!["ssl.alt_alpn"]);
        assert_eq!(config.contexts.len(), 2);
        assert!(matches!(&config.contexts[0], ContextEntry::Server { name, .. } if name == "frontend"));
        assert!(matches!(&config.contexts[1], ContextEntry::Client { name, .. } if name == "backend"));
        assert_eq!(config.contexts[1].name(), "backend");
    }

    #[test]
    fn invalid() {
        let dir = data_dir();

        let yaml = yaml_doc!("contexts: [{name: a, role: proxy}]");
        assert!(TlsInfoConfig::parse_yaml(&yaml, Some(&dir)).is_err());

        let yaml = yaml_doc!("contexts: [{role: client}]");
        assert!(TlsInfoConfig::parse_yaml(&yaml, Some(&dir)).is_err());

        let yaml = yaml_doc!("contexts: [{name: a, role: client, session_ticket_keys: ticket-key-0.bin}]");
        assert!(TlsInfoConfig::parse_yaml(&yaml, Some(&dir)).is_err());

        let yaml = yaml_doc!("listen: 443");
        assert!(TlsInfoConfig::parse_yaml(&yaml, Some(&dir)).is_err());
    }
}
