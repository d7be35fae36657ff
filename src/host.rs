//! The application object that owns controller instances.

use std::sync::Arc;

use crate::config::Settings;
use crate::ids::HostId;

/// Owning application of a set of controller instances.
///
/// Controller instances live as long as their host; the dispatcher caches
/// one instance per (host, controller name).
#[derive(Debug)]
pub struct Host {
    id: HostId,
    name: String,
    settings: Arc<Settings>,
}

impl Host {
    /// Create a host with default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_settings(name, Settings::default())
    }

    /// Create a host with explicit settings.
    #[must_use]
    pub fn with_settings(name: impl Into<String>, settings: Settings) -> Arc<Self> {
        Arc::new(Self {
            id: HostId::new(),
            name: name.into(),
            settings: Arc::new(settings),
        })
    }

    #[must_use]
    pub fn id(&self) -> HostId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
