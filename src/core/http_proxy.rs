// Launcher Plugin Host - Outbound HTTP Proxy
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared outbound network proxy handed to every plugin at init time
//!
//! Settings come from the environment:
//! - `LAUNCHER_PROXY_ENABLED`: "true" or "1" to route plugin traffic through the proxy
//! - `LAUNCHER_PROXY_SERVER`: host name or full URL of the proxy
//! - `LAUNCHER_PROXY_PORT`: port, appended when the server has none
//! - `LAUNCHER_PROXY_USERNAME` / `LAUNCHER_PROXY_PASSWORD`: optional basic auth

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to clients built from the proxy settings
const CLIENT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpProxy {
    pub enabled: bool,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl HttpProxy {
    pub fn from_env() -> Self {
        let enabled = std::env::var("LAUNCHER_PROXY_ENABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);

        let proxy = Self {
            enabled,
            server: non_empty_env("LAUNCHER_PROXY_SERVER"),
            port: non_empty_env("LAUNCHER_PROXY_PORT").and_then(|p| p.parse().ok()),
            username: non_empty_env("LAUNCHER_PROXY_USERNAME"),
            password: non_empty_env("LAUNCHER_PROXY_PASSWORD"),
        };

        if proxy.enabled && proxy.server.is_none() {
            crate::log_warn!("LAUNCHER_PROXY_ENABLED is set but LAUNCHER_PROXY_SERVER is missing");
        }

        proxy
    }

    /// Whether plugin traffic should actually go through the proxy
    pub fn is_active(&self) -> bool {
        self.enabled && self.server.is_some()
    }

    /// Proxy URL, or `None` when the proxy is inactive
    pub fn proxy_url(&self) -> Result<Option<url::Url>, url::ParseError> {
        let Some(server) = self.server.as_deref().filter(|_| self.enabled) else {
            return Ok(None);
        };

        let base = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };

        let mut url = url::Url::parse(&base)?;
        if url.port().is_none() {
            if let Some(port) = self.port {
                // Only fails for URLs that cannot carry a port
                let _ = url.set_port(Some(port));
            }
        }

        Ok(Some(url))
    }

    fn reqwest_proxy(&self) -> anyhow::Result<Option<reqwest::Proxy>> {
        let Some(url) = self.proxy_url().context("Invalid proxy server")? else {
            return Ok(None);
        };

        let mut proxy = reqwest::Proxy::all(url.as_str()).context("Failed to build proxy")?;
        if let Some(username) = &self.username {
            proxy = proxy.basic_auth(username, self.password.as_deref().unwrap_or(""));
        }

        Ok(Some(proxy))
    }

    /// Blocking client for plugins running on worker threads
    pub fn blocking_client(&self) -> anyhow::Result<reqwest::blocking::Client> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .user_agent(format!("launcher-plugin-host/{}", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = self.reqwest_proxy()? {
            builder = builder.proxy(proxy);
        }

        builder.build().context("Failed to create HTTP client")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
