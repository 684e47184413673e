/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod fs;
mod primary;

pub use fs::{as_file_bytes, as_file_path};
pub use primary::{as_bool, as_list, as_string};
