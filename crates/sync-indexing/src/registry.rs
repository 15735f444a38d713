//! The set of registered content types.

use std::sync::Arc;

use tracing::info;

use crate::binding::TypeBinding;

/// Content-type bindings in registration order.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    bindings: Vec<Arc<dyn TypeBinding>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding.
    ///
    /// A binding with an already registered name replaces the old one and
    /// keeps its position.
    pub fn register(&mut self, binding: Arc<dyn TypeBinding>) {
        let name = binding.name().to_string();
        match self.bindings.iter().position(|b| b.name() == name) {
            Some(index) => {
                self.bindings[index] = binding;
                info!(doc_type = %name, "Replaced content type binding");
            }
            None => {
                self.bindings.push(binding);
                info!(doc_type = %name, "Registered content type");
            }
        }
    }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TypeBinding>> {
        self.bindings.iter().find(|b| b.name() == name)
    }

    /// Call `f` for every binding in registration order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<dyn TypeBinding>),
    {
        for binding in &self.bindings {
            f(binding);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TypeBinding>> {
        self.bindings.iter()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
