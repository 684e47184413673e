/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use ahash::AHashSet;
use arc_swap::ArcSwap;

/// A named on/off switch consulted during the handshake.
pub trait FeatureGate: Send + Sync {
    fn enabled(&self, name: &str) -> bool;
}

/// Feature gates that can be flipped at runtime.
///
/// Readers never lock, writers replace the whole set.
#[derive(Default)]
pub struct RuntimeFeatures {
    enabled: ArcSwap<AHashSet<String>>,
}

impl RuntimeFeatures {
    pub fn with_enabled<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: AHashSet<String> = names.into_iter().map(Into::into).collect();
        RuntimeFeatures {
            enabled: ArcSwap::from_pointee(set),
        }
    }

    pub fn enable(&self, name: &str) {
        self.enabled.rcu(|old| {
            let mut set = AHashSet::clone(old);
            set.insert(name.to_string());
            set
        });
    }

    pub fn disable(&self, name: &str) {
        self.enabled.rcu(|old| {
            let mut set = AHashSet::clone(old);
            set.remove(name);
            set
        });
    }
}

impl FeatureGate for RuntimeFeatures {
    fn enabled(&self, name: &str) -> bool {
        self.enabled.load().contains(name)
    }
}
