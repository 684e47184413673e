/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use yaml_rust::Yaml;

/// Resolve a path value against `lookup_dir` if it is relative.
///
/// The file must exist and be a regular file.
pub fn as_file_path(v: &Yaml, lookup_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let Yaml::String(s) = v else {
        return Err(anyhow!("yaml value type for file path should be 'string'"));
    };
    let path = PathBuf::from(s);
    let path = if path.is_absolute() {
        path
    } else if let Some(dir) = lookup_dir {
        dir.join(path)
    } else {
        return Err(anyhow!(
            "invalid value: {} is not an absolute path",
            path.display()
        ));
    };
    if !path.exists() {
        return Err(anyhow!("path {} is not existed", path.display()));
    }
    if !path.is_file() {
        return Err(anyhow!("path {} is not a regular file", path.display()));
    }
    Ok(path)
}

/// Read the raw content of the file referenced by the path value.
///
/// Files larger than `max_size` are rejected with their real size.
pub fn as_file_bytes(
    v: &Yaml,
    lookup_dir: Option<&Path>,
    max_size: usize,
) -> anyhow::Result<Vec<u8>> {
    let path = as_file_path(v, lookup_dir)?;
    let file = std::fs::File::open(&path)
        .map_err(|e| anyhow!("failed to open file {}: {e:?}", path.display()))?;
    let size = file
        .metadata()
        .map_err(|e| anyhow!("failed to get metadata of file {}: {e:?}", path.display()))?
        .len();
    if size > max_size as u64 {
        return Err(anyhow!(
            "file {} has size {size}, larger than the limit {max_size}",
            path.display()
        ));
    }
    let mut contents = Vec::with_capacity(size as usize);
    file.take(max_size as u64)
        .read_to_end(&mut contents)
        .map_err(|e| anyhow!("failed to read contents of file {}: {e:?}", path.display()))?;
    Ok(contents)
}
