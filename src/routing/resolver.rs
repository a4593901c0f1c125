//! Resolution of `Controller.method` handler identifiers.
//!
//! # Design Decisions
//! - The router never knows how controllers are built; it asks a
//!   [`HandlerResolver`] once per identifier at boot
//! - Test fakes are a plain override map consulted before the real entry

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::route::Handler;

/// Turns a handler identifier into an invokable.
pub trait HandlerResolver: Send + Sync {
    /// `None` when nothing is registered under `identifier`.
    fn resolve(&self, identifier: &str) -> Option<Arc<dyn Handler>>;
}

/// In-memory controller registry with fake overrides.
#[derive(Default)]
pub struct ControllerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    fakes: HashMap<String, Arc<dyn Handler>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the real handler for an identifier
    /// (`UsersController.show`, or namespaced `Admin/UsersController.show`).
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> &mut Self {
        self.handlers.insert(identifier.into(), handler);
        self
    }

    /// Override an identifier, typically from tests.
    pub fn fake(&mut self, identifier: impl Into<String>, handler: Arc<dyn Handler>) -> &mut Self {
        self.fakes.insert(identifier.into(), handler);
        self
    }

    /// Remove a fake, falling back to the real handler again.
    pub fn restore(&mut self, identifier: &str) -> &mut Self {
        self.fakes.remove(identifier);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl HandlerResolver for ControllerRegistry {
    fn resolve(&self, identifier: &str) -> Option<Arc<dyn Handler>> {
        self.fakes
            .get(identifier)
            .or_else(|| self.handlers.get(identifier))
            .cloned()
    }
}
