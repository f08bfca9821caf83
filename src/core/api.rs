// Launcher Plugin Host - Host API Handle
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Capability handle plugins use to talk back to the host application

use crate::core::query::Query;
use crate::plugins::{PluginMetadata, ResultItem};
use crate::{log_info, log_notice};

/// Host operations a plugin may invoke
///
/// One instance is shared by every plugin for the lifetime of the process.
/// Calls from script plugins arrive on a blocking-pool thread, one at a time
/// per plugin and in the order the plugin sent them. They may block, and may
/// query the same plugin again.
pub trait PublicApi: Send + Sync {
    /// Replace the text in the query box, optionally running it again
    fn change_query(&self, query: &str, requery: bool);

    /// Show a transient notification
    fn show_message(&self, title: &str, sub_title: &str, icon_path: Option<&str>);

    /// Push results outside of a `query` call (e.g. after a slow lookup finishes)
    fn push_results(&self, query: &Query, plugin: &PluginMetadata, results: Vec<ResultItem>);
}

/// Host API that reports everything through the logger
///
/// Used by the command-line host, which has no window to update.
#[derive(Debug, Default)]
pub struct LoggingApi;

impl PublicApi for LoggingApi {
    fn change_query(&self, query: &str, requery: bool) {
        log_info!("Query changed to '{}' (requery: {})", query, requery);
    }

    fn show_message(&self, title: &str, sub_title: &str, _icon_path: Option<&str>) {
        log_notice!("{}: {}", title, sub_title);
    }

    fn push_results(&self, query: &Query, plugin: &PluginMetadata, results: Vec<ResultItem>) {
        log_info!(
            "Plugin {} pushed {} result(s) for '{}'",
            plugin.id,
            results.len(),
            query.raw_query
        );
    }
}
