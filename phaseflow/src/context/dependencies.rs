//! Named service injection for phases.

use crate::errors::PhaseflowError;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Service = Arc<dyn Any + Send + Sync>;

/// Services (API clients, renderers, caches) handed to a phase before it is
/// registered.
///
/// Lookups are typed. Asking for a name that was never injected, or asking
/// for it as the wrong type, is a programming error and fails immediately
/// with [`PhaseflowError::DependencyNotInjected`].
#[derive(Clone, Default)]
pub struct Dependencies {
    owner: String,
    services: HashMap<String, Service>,
}

impl Dependencies {
    /// Creates an empty container owned by the named phase.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            services: HashMap::new(),
        }
    }

    /// Injects a service under `name`, replacing any previous one.
    pub fn inject<T: Any + Send + Sync>(&mut self, name: impl Into<String>, service: T) {
        self.inject_arc(name, Arc::new(service));
    }

    /// Injects an already shared service.
    pub fn inject_arc<T: Any + Send + Sync>(&mut self, name: impl Into<String>, service: Arc<T>) {
        let name = name.into();
        tracing::debug!(owner = %self.owner, dependency = %name, "Injected dependency");
        self.services.insert(name, service);
    }

    /// Gets a service by name.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, PhaseflowError> {
        self.services
            .get(name)
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
            .ok_or_else(|| PhaseflowError::DependencyNotInjected {
                owner: self.owner.clone(),
                name: name.to_string(),
            })
    }

    /// Returns true if a service was injected under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Returns the injected names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.services.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("owner", &self.owner)
            .field("services", &self.names())
            .finish()
    }
}
