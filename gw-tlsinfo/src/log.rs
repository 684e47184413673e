/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use slog::Drain;
use slog_scope::GlobalLoggerGuard;

use gw_stdlog::StdLogDrain;

/// Route `log` records of all crates to stderr through slog.
pub fn setup(verbose_level: u8) -> Result<GlobalLoggerGuard, log::SetLoggerError> {
    let drain = StdLogDrain::new(verbose_level > 1, false);
    let logger = slog::Logger::root(drain.fuse(), slog::o!());

    let scope_guard = slog_scope::set_global_logger(logger);

    let log_level = match verbose_level {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };

    slog_stdlog::init_with_level(log_level)?;
    Ok(scope_guard)
}
