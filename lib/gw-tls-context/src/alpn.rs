/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use crate::{AlpnConfigError, FeatureGate};

const MAX_PROTOCOL_NAME_LENGTH: usize = u8::MAX as usize;
const MAX_ENCODED_LIST_LENGTH: usize = u16::MAX as usize;

/// ALPN protocol names in wire format, each one prefixed by its length byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlpnProtocolList {
    wire: Vec<u8>,
}

impl AlpnProtocolList {
    /// Encode a comma separated protocol string like `h2,http/1.1`.
    ///
    /// An empty string means ALPN is disabled and gives an empty list.
    pub fn encode(protocols: &str) -> Result<Self, AlpnConfigError> {
        if protocols.is_empty() {
            return Ok(AlpnProtocolList::default());
        }

        let mut wire = Vec::with_capacity(protocols.len() + 1);
        for (index, name) in protocols.split(',').enumerate() {
            let length = name.len();
            if length == 0 {
                return Err(AlpnConfigError::EmptyName(index));
            }
            if length > MAX_PROTOCOL_NAME_LENGTH {
                return Err(AlpnConfigError::NameTooLong { index, length });
            }
            wire.push(length as u8);
            wire.extend_from_slice(name.as_bytes());
            if wire.len() >= MAX_ENCODED_LIST_LENGTH {
                return Err(AlpnConfigError::ListTooLong(wire.len()));
            }
        }

        Ok(AlpnProtocolList { wire })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.wire.is_empty()
    }

    #[inline]
    pub fn wire_bytes(&self) -> &[u8] {
        &self.wire
    }

    pub fn iter(&self) -> WireProtocolIter<'_> {
        WireProtocolIter { buf: &self.wire }
    }

    /// Server preference selection: the first of our protocols that the
    /// client also offered. The returned slice borrows from `client_offer`.
    pub fn select<'a>(&self, client_offer: &'a [u8]) -> Option<&'a [u8]> {
        self.iter().find_map(|ours| {
            WireProtocolIter { buf: client_offer }.find(|theirs| *theirs == ours)
        })
    }
}

/// Iterate over the protocol names of a wire format list.
///
/// Iteration stops at the first truncated or empty entry.
pub struct WireProtocolIter<'a> {
    buf: &'a [u8],
}

impl<'a> Iterator for WireProtocolIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, left) = self.buf.split_first()?;
        let len = len as usize;
        if len == 0 || left.len() < len {
            self.buf = &[];
            return None;
        }
        let (name, left) = left.split_at(len);
        self.buf = left;
        Some(name)
    }
}

/// Server side ALPN selection, with an alternate list behind a runtime gate.
pub struct ServerAlpnSelector {
    primary: AlpnProtocolList,
    alternate: AlpnProtocolList,
    gate: Arc<dyn FeatureGate>,
    gate_name: String,
}

impl ServerAlpnSelector {
    pub fn new(
        primary: AlpnProtocolList,
        alternate: AlpnProtocolList,
        gate: Arc<dyn FeatureGate>,
        gate_name: String,
    ) -> Self {
        ServerAlpnSelector {
            primary,
            alternate,
            gate,
            gate_name,
        }
    }

    #[inline]
    pub fn primary(&self) -> &AlpnProtocolList {
        &self.primary
    }

    #[inline]
    pub fn alternate(&self) -> &AlpnProtocolList {
        &self.alternate
    }

    #[inline]
    pub fn gate_name(&self) -> &str {
        &self.gate_name
    }

    /// Whether any selection could ever succeed.
    pub fn is_enabled(&self) -> bool {
        !self.primary.is_empty() || !self.alternate.is_empty()
    }

    /// Current state of the feature gate for the alternate list.
    pub fn gate_enabled(&self) -> bool {
        self.gate.enabled(&self.gate_name)
    }

    /// The list in effect now, the gate is evaluated on every call.
    pub fn active_list(&self) -> &AlpnProtocolList {
        if !self.alternate.is_empty() && self.gate_enabled() {
            &self.alternate
        } else {
            &self.primary
        }
    }

    pub fn select<'a>(&self, client_offer: &'a [u8]) -> Option<&'a [u8]> {
        self.active_list().select(client_offer)
    }
}
