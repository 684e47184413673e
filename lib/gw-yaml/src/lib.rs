/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

#[macro_use]
mod macros;

mod doc;
mod map;

pub mod value;

pub use doc::load_doc;
pub use map::{foreach_kv, get_required, normalize_key};
