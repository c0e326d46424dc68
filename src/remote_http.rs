//! Reducer invocation over the SpacetimeDB HTTP API.
//!
//! `POST {host}/v1/database/{database}/call/{reducer}` with the positional
//! arguments as a JSON array. Calls are spawned on the tokio runtime and the
//! outcome is published on the shared `ReducerEventBus`.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::DispatchConfig;
use crate::reducer_names::ReducerName;
use crate::remote::{CommitStatus, ReducerCall, ReducerEvent, ReducerEventBus, ReducerInvoker};

pub struct HttpReducerInvoker {
    client: reqwest::Client,
    host: String,
    database: String,
    token: Option<String>,
    runtime: Handle,
    /// Wire names of the reducers the module exposes, if known.
    catalog: Option<HashSet<String>>,
    events: Arc<ReducerEventBus>,
}

impl HttpReducerInvoker {
    /// Must be called from within a tokio runtime.
    pub fn new(config: &DispatchConfig, events: Arc<ReducerEventBus>) -> Result<Self, String> {
        let runtime = Handle::try_current().map_err(|e| format!("No tokio runtime for reducer calls: {}", e))?;
        Ok(HttpReducerInvoker {
            client: reqwest::Client::new(),
            host: config.spacetime_host.clone(),
            database: config.database.clone(),
            token: config.token.clone(),
            runtime,
            catalog: None,
            events,
        })
    }

    /// Restricts `knows_reducer` to the given module reducer names (snake_case).
    pub fn with_catalog<I, S>(mut self, reducers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog = Some(reducers.into_iter().map(Into::into).collect());
        self
    }

    pub fn call_url(&self, reducer: &ReducerName) -> String {
        format!("{}/v1/database/{}/call/{}", self.host, self.database, reducer.wire_name())
    }
}

impl ReducerInvoker for HttpReducerInvoker {
    fn knows_reducer(&self, reducer: &ReducerName) -> bool {
        match &self.catalog {
            Some(catalog) => catalog.contains(&reducer.wire_name()),
            None => true,
        }
    }

    fn invoke(&self, call: ReducerCall) -> Result<(), String> {
        let url = self.call_url(&call.reducer);
        let body = call.args_json();
        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let events = self.events.clone();

        self.runtime.spawn(async move {
            let status = match request.send().await {
                Ok(response) if response.status().is_success() => CommitStatus::Committed,
                Ok(response) => {
                    let code = response.status();
                    let reason = response.text().await.unwrap_or_default();
                    log::error!("[ReducerHttp] {} rejected ({}): {}", call.reducer, code, reason);
                    if reason.to_ascii_lowercase().contains("out of energy") {
                        CommitStatus::OutOfEnergy
                    } else {
                        CommitStatus::Failed(if reason.is_empty() { code.to_string() } else { reason })
                    }
                }
                Err(e) => {
                    log::error!("[ReducerHttp] {} could not be delivered: {}", call.reducer, e);
                    CommitStatus::Failed(e.to_string())
                }
            };
            events.publish(&ReducerEvent { reducer: call.reducer, args: call.args, status });
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn urls_use_module_reducer_names() {
        let config = DispatchConfig { database: "world".into(), ..DispatchConfig::default() };
        let invoker = HttpReducerInvoker::new(&config, Arc::new(ReducerEventBus::new())).unwrap();
        assert_eq!(
            invoker.call_url(&ReducerName::new("moveItemFromCampfireToPlayerSlot")),
            "http://localhost:3000/v1/database/world/call/move_item_from_campfire_to_player_slot"
        );
    }

    #[tokio::test]
    async fn catalog_limits_known_reducers() {
        let invoker = HttpReducerInvoker::new(&DispatchConfig::default(), Arc::new(ReducerEventBus::new()))
            .unwrap()
            .with_catalog(["move_item_to_campfire"]);
        assert!(invoker.knows_reducer(&ReducerName::new("moveItemToCampfire")));
        assert!(!invoker.knows_reducer(&ReducerName::new("moveItemToRefrigerator")));
    }

    #[test]
    fn construction_outside_a_runtime_is_an_error() {
        assert!(HttpReducerInvoker::new(&DispatchConfig::default(), Arc::new(ReducerEventBus::new())).is_err());
    }
}
