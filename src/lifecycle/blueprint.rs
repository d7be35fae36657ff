//! Blueprint composer.
//!
//! A [`Blueprint`] is the registration-time definition of a controller family:
//! its filters, its per-event listener lists and its action table. Blueprints
//! are built once through a [`BlueprintBuilder`] and frozen behind an `Arc`;
//! nothing mutates them at request time.
//!
//! Deriving from a base copies the base's filters and listeners first and
//! appends the derived blueprint's own registrations after them, so base
//! participants always run before derived ones. Actions merge the other way
//! round: the derived blueprint's own actions win, and base actions fill in
//! only the names the derived blueprint left empty. That merge happens when a
//! [`ControllerInstance`](super::ControllerInstance) is bound.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::{debug, warn};

use super::event::{EventTable, LifecycleEvent};
use super::handler::Handler;

/// HTTP verbs an action spec may declare handlers for.
pub const RECOGNIZED_VERBS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// Filters and verb handlers for one action.
#[derive(Clone, Default)]
pub struct ActionSpec {
    filters: Vec<Handler>,
    verbs: HashMap<Method, Handler>,
}

impl ActionSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action-level filter. Runs after every blueprint filter.
    #[must_use]
    pub fn filter(mut self, filter: Handler) -> Self {
        self.filters.push(filter);
        self
    }

    /// Register the handler for `verb`, replacing any earlier one.
    #[must_use]
    pub fn verb(mut self, verb: Method, handler: Handler) -> Self {
        self.verbs.insert(verb, handler);
        self
    }

    #[must_use]
    pub fn get(self, handler: Handler) -> Self {
        self.verb(Method::GET, handler)
    }

    #[must_use]
    pub fn post(self, handler: Handler) -> Self {
        self.verb(Method::POST, handler)
    }

    #[must_use]
    pub fn put(self, handler: Handler) -> Self {
        self.verb(Method::PUT, handler)
    }

    #[must_use]
    pub fn delete(self, handler: Handler) -> Self {
        self.verb(Method::DELETE, handler)
    }

    #[must_use]
    pub fn filters(&self) -> &[Handler] {
        &self.filters
    }

    /// Handler registered for `verb`.
    #[must_use]
    pub fn handler(&self, verb: &Method) -> Option<&Handler> {
        self.verbs.get(verb)
    }

    /// True when at least one recognized verb has a handler.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.verbs.keys().any(|verb| RECOGNIZED_VERBS.contains(verb))
    }

    /// Declared verbs, sorted for stable output.
    #[must_use]
    pub fn verbs(&self) -> Vec<Method> {
        let mut verbs: Vec<Method> = self.verbs.keys().cloned().collect();
        verbs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        verbs
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec")
            .field("filters", &self.filters.len())
            .field("verbs", &self.verbs())
            .finish()
    }
}

/// Frozen definition of a controller family.
pub struct Blueprint {
    name: String,
    base: Option<Arc<Blueprint>>,
    filters: Vec<Handler>,
    events: EventTable,
    actions: HashMap<String, ActionSpec>,
}

impl Blueprint {
    /// Start a blueprint with no base.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> BlueprintBuilder {
        BlueprintBuilder {
            name: name.into(),
            base: None,
            filters: Vec::new(),
            events: EventTable::default(),
            actions: HashMap::new(),
        }
    }

    /// Start a blueprint derived from `base`.
    ///
    /// The base's filters and listeners are copied now; registrations made on
    /// the returned builder are appended after them.
    #[must_use]
    pub fn derive(base: &Arc<Blueprint>, name: impl Into<String>) -> BlueprintBuilder {
        let mut builder = Self::builder(name);
        builder.filters.extend(base.filters.iter().cloned());
        builder.events.extend_from(&base.events);
        builder.base = Some(Arc::clone(base));
        builder
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base(&self) -> Option<&Arc<Blueprint>> {
        self.base.as_ref()
    }

    /// Blueprint-level filters, base filters first.
    #[must_use]
    pub fn filters(&self) -> &[Handler] {
        &self.filters
    }

    #[must_use]
    pub fn events(&self) -> &EventTable {
        &self.events
    }

    /// Listeners for `event`, base listeners first.
    #[must_use]
    pub fn listeners(&self, event: LifecycleEvent) -> &[Handler] {
        self.events.listeners(event)
    }

    /// Actions declared directly on this blueprint, including invalid ones.
    #[must_use]
    pub fn own_actions(&self) -> &HashMap<String, ActionSpec> {
        &self.actions
    }

    /// Action table an instance of this blueprint binds.
    ///
    /// Own valid actions take precedence; base actions (resolved the same way,
    /// recursively) only fill names not already present. Specs without a
    /// recognized verb are dropped.
    #[must_use]
    pub fn merged_actions(&self) -> HashMap<String, ActionSpec> {
        let mut merged = HashMap::with_capacity(self.actions.len());
        for (name, spec) in &self.actions {
            if spec.is_valid() {
                merged.insert(name.clone(), spec.clone());
            } else {
                warn!(
                    blueprint = %self.name,
                    action = %name,
                    "Dropping action without a recognized verb handler"
                );
            }
        }
        if let Some(base) = &self.base {
            for (name, spec) in base.merged_actions() {
                if !merged.contains_key(&name) {
                    debug!(
                        blueprint = %self.name,
                        base = %base.name,
                        action = %name,
                        "Inheriting action from base blueprint"
                    );
                    merged.insert(name, spec);
                }
            }
        }
        merged
    }
}

impl fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("base", &self.base.as_ref().map(|b| b.name.as_str()))
            .field("filters", &self.filters.len())
            .field("events", &self.events)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Registration phase of a [`Blueprint`]. Consumed by [`BlueprintBuilder::build`].
pub struct BlueprintBuilder {
    name: String,
    base: Option<Arc<Blueprint>>,
    filters: Vec<Handler>,
    events: EventTable,
    actions: HashMap<String, ActionSpec>,
}

impl BlueprintBuilder {
    /// Append a blueprint-level filter.
    #[must_use]
    pub fn filter(mut self, filter: Handler) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append `listener` to the list for `event`.
    #[must_use]
    pub fn on(mut self, event: LifecycleEvent, listener: Handler) -> Self {
        self.events.push(event, listener);
        self
    }

    /// Declare `name`, replacing an earlier declaration with the same name.
    #[must_use]
    pub fn action(mut self, name: impl Into<String>, spec: ActionSpec) -> Self {
        self.actions.insert(name.into(), spec);
        self
    }

    /// Freeze the blueprint.
    #[must_use]
    pub fn build(self) -> Arc<Blueprint> {
        debug!(
            blueprint = %self.name,
            base = self.base.as_ref().map(|b| b.name.as_str()).unwrap_or("-"),
            filters = self.filters.len(),
            listeners = self.events.len(),
            actions = self.actions.len(),
            "Blueprint composed"
        );
        Arc::new(Blueprint {
            name: self.name,
            base: self.base,
            filters: self.filters,
            events: self.events,
            actions: self.actions,
        })
    }
}
