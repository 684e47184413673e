/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

/// Lower case the key and use `_` as the word separator, so that
/// `Verify-Certificate-Hash` and `verify_certificate_hash` are the same key.
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

pub fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        let Yaml::String(key) = k else {
            return Err(anyhow!("key in map should be string, found {k:?}"));
        };
        f(key, v).context(format!("failed to parse value of key {key}"))?;
    }
    Ok(())
}

pub fn get_required<'a>(map: &'a yaml::Hash, k: &str) -> anyhow::Result<&'a Yaml> {
    map.get(&Yaml::String(k.to_owned()))
        .ok_or_else(|| anyhow!("no required key {k} found in this map"))
}
