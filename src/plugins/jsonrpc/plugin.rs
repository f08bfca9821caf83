//! Plugin proxy that forwards every call to a script subprocess

use crate::core::{PublicApi, Query};
use crate::log_warn;
use crate::plugins::error::{PluginError, PluginResult};
use crate::plugins::jsonrpc::client::{ProcessCommand, RpcClient};
use crate::plugins::metadata::PluginMetadata;
use crate::plugins::plugin::{Plugin, PluginInitContext, ResultItem};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const METHOD_INIT: &str = "init";
pub const METHOD_QUERY: &str = "query";

#[derive(Debug, Deserialize)]
struct ChangeQueryParams {
    query: String,
    #[serde(default)]
    requery: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowMessageParams {
    title: String,
    #[serde(default)]
    sub_title: String,
    #[serde(default)]
    icon_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PushResultsParams {
    #[serde(default)]
    query: Query,
    results: Vec<ResultItem>,
}

pub struct JsonRpcPlugin {
    metadata: Arc<PluginMetadata>,
    client: RpcClient,
}

impl JsonRpcPlugin {
    pub fn new(metadata: Arc<PluginMetadata>, command: ProcessCommand) -> Self {
        let timeout = (metadata.timeout > 0).then(|| Duration::from_secs(metadata.timeout));
        let client = RpcClient::new(metadata.id.clone(), command, timeout);
        Self { metadata, client }
    }
}

impl Plugin for JsonRpcPlugin {
    fn init(&self, context: &PluginInitContext) -> PluginResult<()> {
        let api = Arc::clone(&context.api);
        let metadata = Arc::clone(&self.metadata);
        self.client.set_notification_handler(Arc::new(move |method: &str, params: Value| {
            forward_api_call(api.as_ref(), &metadata, method, params)
        }));

        self.client.call(
            METHOD_INIT,
            json!({
                "metadata": context.current_plugin_metadata.as_ref(),
                "proxy": context.proxy.as_ref(),
            }),
        )?;
        Ok(())
    }

    fn query(&self, query: &Query) -> PluginResult<Vec<ResultItem>> {
        let value = self.client.call(METHOD_QUERY, serde_json::to_value(query)?)?;
        if value.is_null() {
            return Ok(Vec::new());
        }

        serde_json::from_value(value).map_err(|e| {
            PluginError::Protocol(format!("plugin {} returned malformed results: {}", self.metadata.id, e))
        })
    }
}

/// Route a plugin notification to the host API
fn forward_api_call(api: &dyn PublicApi, metadata: &PluginMetadata, method: &str, params: Value) {
    let outcome = match method {
        "api.change_query" => serde_json::from_value::<ChangeQueryParams>(params)
            .map(|p| api.change_query(&p.query, p.requery)),
        "api.show_message" => serde_json::from_value::<ShowMessageParams>(params)
            .map(|p| api.show_message(&p.title, &p.sub_title, p.icon_path.as_deref())),
        "api.push_results" => serde_json::from_value::<PushResultsParams>(params)
            .map(|p| api.push_results(&p.query, metadata, p.results)),
        _ => {
            log_warn!("Plugin '{}' called unknown host method '{}'", metadata.id, method);
            return;
        }
    };

    if let Err(e) = outcome {
        log_warn!("Plugin '{}' sent bad params for '{}': {}", metadata.id, method, e);
    }
}
