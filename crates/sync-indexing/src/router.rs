//! Hook dispatch.
//!
//! Built once from the registered bindings' hook tables. A hook name may
//! be claimed by several types; each one resolves the payload on its own.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use sync_types::{Action, TriggerKind, TriggerPayload};

use crate::binding::TypeBinding;
use crate::registry::TypeRegistry;

struct Route {
    binding: Arc<dyn TypeBinding>,
    kind: TriggerKind,
}

/// Dispatch table from hook name to type-specific resolvers.
#[derive(Default)]
pub struct EventRouter {
    routes: HashMap<String, Vec<Route>>,
}

impl EventRouter {
    /// Build the dispatch table from every registered binding.
    pub fn from_registry(registry: &TypeRegistry) -> Self {
        let mut routes: HashMap<String, Vec<Route>> = HashMap::new();
        registry.for_each(|binding| {
            for hook in binding.hooks() {
                routes.entry(hook.name.clone()).or_default().push(Route {
                    binding: binding.clone(),
                    kind: hook.kind,
                });
            }
        });
        debug!(hooks = routes.len(), "Built event router");
        Self { routes }
    }

    /// Whether any type listens to `hook`.
    pub fn handles(&self, hook: &str) -> bool {
        self.routes.contains_key(hook)
    }

    /// Hook names known to the router, sorted.
    pub fn hooks(&self) -> Vec<&str> {
        let mut hooks: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        hooks.sort_unstable();
        hooks
    }

    /// Resolve a notification to the actions it implies.
    ///
    /// Unknown hooks resolve to nothing.
    pub fn resolve(&self, hook: &str, payload: &TriggerPayload) -> Vec<Action> {
        let Some(routes) = self.routes.get(hook) else {
            debug!(hook, "No content type listens to hook");
            return Vec::new();
        };

        routes
            .iter()
            .filter_map(|route| route.binding.resolve(route.kind, payload))
            .collect()
    }
}
