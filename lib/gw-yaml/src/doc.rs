/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::anyhow;
use yaml_rust::{Yaml, YamlLoader};

/// Load the first document of a yaml file.
pub fn load_doc(path: &Path) -> anyhow::Result<Yaml> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read file {}: {e:?}", path.display()))?;
    let mut docs = YamlLoader::load_from_str(&contents)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    if docs.is_empty() {
        return Err(anyhow!("no yaml document found in file {}", path.display()));
    }
    Ok(docs.swap_remove(0))
}
