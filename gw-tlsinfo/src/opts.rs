/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgAction, Command, ValueHint, value_parser};

const ARGS_VERBOSE: &str = "verbose";
const ARGS_CONFIG_FILE: &str = "config-file";
const ARGS_WARN_DAYS: &str = "warn-days";
const ARGS_ENABLE_FEATURE: &str = "enable-feature";

const DEFAULT_WARN_DAYS: u32 = 30;

pub struct ProcArgs {
    pub verbose_level: u8,
    pub config_file: PathBuf,
    pub warn_days: u32,
    pub enabled_features: Vec<String>,
}

fn build_cli_args() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .about("Load gateway TLS contexts and show their certificate summaries")
        .arg(
            Arg::new(ARGS_VERBOSE)
                .help("Show verbose output")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .long("verbose"),
        )
        .arg(
            Arg::new(ARGS_CONFIG_FILE)
                .help("Config file path")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_hint(ValueHint::FilePath)
                .value_parser(value_parser!(PathBuf))
                .required(true)
                .short('c')
                .long("config-file"),
        )
        .arg(
            Arg::new(ARGS_WARN_DAYS)
                .help("Warn if any certificate expires within this many days")
                .num_args(1)
                .value_name("DAYS")
                .value_parser(value_parser!(u32))
                .default_value("30")
                .long("warn-days"),
        )
        .arg(
            Arg::new(ARGS_ENABLE_FEATURE)
                .help("Enable a runtime feature gate, such as ssl.alt_alpn")
                .num_args(1)
                .value_name("FEATURE")
                .action(ArgAction::Append)
                .short('F')
                .long("enable-feature"),
        )
}

pub fn parse_clap() -> anyhow::Result<ProcArgs> {
    let args = build_cli_args().get_matches();

    let verbose_level = args.get_one::<u8>(ARGS_VERBOSE).copied().unwrap_or_default();
    let Some(config_file) = args.get_one::<PathBuf>(ARGS_CONFIG_FILE) else {
        return Err(anyhow!("no config file given"));
    };
    let warn_days = args
        .get_one::<u32>(ARGS_WARN_DAYS)
        .copied()
        .unwrap_or(DEFAULT_WARN_DAYS);
    let enabled_features = args
        .get_many::<String>(ARGS_ENABLE_FEATURE)
        .map(|v| v.cloned().collect())
        .unwrap_or_default();

    Ok(ProcArgs {
        verbose_level,
        config_file: config_file.clone(),
        warn_days,
        enabled_features,
    })
}
