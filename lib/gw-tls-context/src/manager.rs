/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use arc_swap::ArcSwap;
use log::info;

use crate::{ClientTlsContextConfig, ServerTlsContextConfig, TlsContext, TlsContextBuilder};

type ContextSlot = Arc<ArcSwap<TlsContext>>;

/// Owns the live contexts by name.
///
/// A reload builds a complete new context before it is swapped in, so a
/// failed reload leaves the old one untouched.
pub struct TlsContextManager {
    builder: TlsContextBuilder,
    contexts: Mutex<BTreeMap<String, ContextSlot>>,
}

impl TlsContextManager {
    pub fn new(builder: TlsContextBuilder) -> Self {
        TlsContextManager {
            builder,
            contexts: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn load_client(
        &self,
        name: &str,
        config: &ClientTlsContextConfig,
    ) -> anyhow::Result<ContextSlot> {
        let context = self
            .builder
            .build_client(config)
            .context(format!("failed to build client tls context {name}"))?;
        Ok(self.publish(name, context))
    }

    pub fn load_server(
        &self,
        name: &str,
        config: &ServerTlsContextConfig,
    ) -> anyhow::Result<ContextSlot> {
        let context = self
            .builder
            .build_server(config)
            .context(format!("failed to build server tls context {name}"))?;
        Ok(self.publish(name, context))
    }

    fn publish(&self, name: &str, context: TlsContext) -> ContextSlot {
        let mut contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        match contexts.get(name) {
            Some(slot) => {
                let old = slot.swap(Arc::new(context));
                old.retire();
                info!("tls context {name} reloaded, the old one is retired");
                slot.clone()
            }
            None => {
                let slot = Arc::new(ArcSwap::from_pointee(context));
                contexts.insert(name.to_string(), slot.clone());
                info!("tls context {name} loaded");
                slot
            }
        }
    }

    /// The slot of a named context, load from it to get the current one.
    pub fn get(&self, name: &str) -> Option<ContextSlot> {
        let contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        contexts.get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<ContextSlot> {
        let mut contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        let slot = contexts.remove(name)?;
        slot.load().retire();
        info!("tls context {name} removed");
        Some(slot)
    }

    pub fn names(&self) -> Vec<String> {
        let contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        contexts.keys().cloned().collect()
    }

    /// Days until the first certificate of any live context expires.
    pub fn days_until_first_cert_expires(&self) -> u32 {
        let contexts = self.contexts.lock().unwrap_or_else(|e| e.into_inner());
        contexts
            .values()
            .map(|slot| slot.load().days_until_first_cert_expires())
            .min()
            .unwrap_or(u32::MAX)
    }
}
