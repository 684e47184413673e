/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use anyhow::Context;
use log::{error, info, warn};

use gw_tls_context::{RuntimeFeatures, TlsContextBuilder, TlsContextManager, TlsContextStats};
use gw_tlsinfo::config::TlsInfoConfig;

fn main() -> anyhow::Result<()> {
    openssl::init();

    let proc_args = gw_tlsinfo::opts::parse_clap()?;
    let _log_guard = gw_tlsinfo::log::setup(proc_args.verbose_level)
        .context("failed to setup logger")?;

    let config = TlsInfoConfig::load(&proc_args.config_file)?;
    let features = Arc::new(RuntimeFeatures::with_enabled(
        config
            .features
            .iter()
            .chain(proc_args.enabled_features.iter())
            .cloned(),
    ));
    let stats = Arc::new(TlsContextStats::new("tlsinfo"));
    let manager = TlsContextManager::new(TlsContextBuilder::new(stats, features));

    let mut failed = 0usize;
    for entry in &config.contexts {
        if let Err(e) = entry.load_into(&manager) {
            error!("{e:?}");
            failed += 1;
        }
    }
    info!(
        "{} tls contexts loaded, {failed} failed",
        config.contexts.len() - failed
    );

    for name in manager.names() {
        if let Some(slot) = manager.get(&name) {
            print!("{}", gw_tlsinfo::report::context_summary(&name, &slot.load()));
        }
    }

    let days = manager.days_until_first_cert_expires();
    if days != u32::MAX {
        println!("days until first cert expires: {days}");
        if days < proc_args.warn_days {
            warn!(
                "a certificate expires in {days} days, within the {} days threshold",
                proc_args.warn_days
            );
        }
    }

    if failed > 0 {
        return Err(anyhow::anyhow!("{failed} tls contexts failed to load"));
    }
    Ok(())
}
