// Launcher Plugin Host - Command Line Entry Point
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::{Context, Result};
use clap::Parser;
use launcher_plugin_host::config::{user_data_dir, Cli};
use launcher_plugin_host::core::logger::init_from_args;
use launcher_plugin_host::core::{HttpProxy, LoggingApi, Query};
use launcher_plugin_host::plugins::env::{load_env_file, PLUGIN_ENV_FILE};
use launcher_plugin_host::plugins::{default_loaders, PluginManager};
use launcher_plugin_host::{
    log_info, log_init_failed, log_init_ok_with_details, log_init_start, log_init_warn, log_warn,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle};

fn main() -> Result<()> {
    let args = Cli::parse();

    init_from_args(args.debug, args.journald).context("Failed to initialize logger")?;

    let mut builder = Builder::new_multi_thread();
    builder
        .enable_all()
        .thread_name("plugin-host")
        .max_blocking_threads(args.max_blocking_threads);
    if let Some(workers) = args.worker_threads {
        builder.worker_threads(workers);
    }
    let runtime = builder.build().context("Failed to build tokio runtime")?;

    runtime.block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let env_path = user_data_dir().join(PLUGIN_ENV_FILE);
    let plugin_env = match load_env_file(&env_path) {
        Ok(env) => env,
        Err(e) => {
            log_warn!("Ignoring {}: {:#}", env_path.display(), e);
            HashMap::new()
        }
    };

    let proxy = HttpProxy::from_env();
    if proxy.is_active() {
        log_info!("Plugins will use HTTP proxy {:?}:{:?}", proxy.server, proxy.port);
    }

    let manager = PluginManager::new(
        args.plugin_directories(),
        default_loaders(&args.interpreters(), plugin_env),
        Arc::new(proxy),
        Arc::new(LoggingApi),
        Handle::current(),
    );

    if let Some(path) = &args.debug_plugin {
        manager.activate_plugin_debugger(path);
    }

    log_init_start!("plugin manager");
    let summary = manager.init().wait().await;
    let details = format!("{} ready, {} failed", summary.ready.len(), summary.failed.len());
    if summary.failed.is_empty() {
        log_init_ok_with_details!("plugin manager", &details);
    } else if summary.ready.is_empty() {
        log_init_failed!("plugin manager", &format!("{} ({})", details, summary.failed.join(", ")));
    } else {
        log_init_warn!("plugin manager", &format!("{} ({})", details, summary.failed.join(", ")));
    }

    if args.list {
        for pair in manager.all_plugins() {
            let metadata = &pair.metadata;
            println!(
                "{:<24} {:<8} {:<10} {:<6} {}",
                metadata.id,
                metadata.language,
                format!("{:?}", metadata.plugin_type),
                metadata.action_keyword,
                metadata.name
            );
        }
    }

    if let Some(text) = &args.query {
        let query = Query::parse(text);
        if manager.hit_thirdparty_keyword(&query) {
            log_info!("Keyword '{}' belongs to a third-party plugin", query.action_name);
        }

        for result in manager.query(&query).await {
            println!(
                "[{:>4}] {} - {} ({})",
                result.score, result.title, result.sub_title, result.plugin_id
            );
        }
    }

    Ok(())
}
