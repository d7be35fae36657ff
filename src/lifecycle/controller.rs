use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use super::blueprint::{ActionSpec, Blueprint};
use super::event::EventTable;
use super::handler::Handler;
use crate::error::LookupError;
use crate::host::Host;

/// A blueprint bound to one host.
///
/// Created once per (host, controller) and shared read-only by every request
/// routed to it. Filters and listeners are copied from the blueprint; the
/// action table is the blueprint's merged table.
pub struct ControllerInstance {
    blueprint: Arc<Blueprint>,
    host: Arc<Host>,
    filters: Vec<Handler>,
    events: EventTable,
    actions: HashMap<String, ActionSpec>,
}

impl ControllerInstance {
    #[must_use]
    pub fn new(blueprint: Arc<Blueprint>, host: Arc<Host>) -> Self {
        let filters = blueprint.filters().to_vec();
        let events = blueprint.events().clone();
        let actions = blueprint.merged_actions();
        debug!(
            controller = %blueprint.name(),
            host = %host.name(),
            host_id = %host.id(),
            actions = actions.len(),
            "Controller instance bound"
        );
        Self {
            blueprint,
            host,
            filters,
            events,
            actions,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.blueprint.name()
    }

    #[must_use]
    pub fn blueprint(&self) -> &Arc<Blueprint> {
        &self.blueprint
    }

    #[must_use]
    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    #[must_use]
    pub fn filters(&self) -> &[Handler] {
        &self.filters
    }

    #[must_use]
    pub fn events(&self) -> &EventTable {
        &self.events
    }

    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    /// Bound action names, sorted.
    #[must_use]
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve the action spec and verb handler for a request.
    pub fn lookup(&self, action: &str, verb: &Method) -> Result<(&ActionSpec, &Handler), LookupError> {
        let spec = self
            .actions
            .get(action)
            .ok_or_else(|| LookupError::UnknownAction {
                action: action.to_string(),
            })?;
        let handler = spec
            .handler(verb)
            .ok_or_else(|| LookupError::UnsupportedVerb {
                action: action.to_string(),
                verb: verb.clone(),
            })?;
        Ok((spec, handler))
    }
}

impl fmt::Debug for ControllerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("name", &self.name())
            .field("host", &self.host.name())
            .field("filters", &self.filters.len())
            .field("events", &self.events)
            .field("actions", &self.action_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Handler::continuation(|_cx, next| {
            next.proceed();
            Ok(())
        })
    }

    #[test]
    fn test_lookup() {
        let blueprint = Blueprint::builder("Users")
            .action("index", ActionSpec::new().get(noop()))
            .build();
        let instance = ControllerInstance::new(blueprint, Host::new("app"));

        assert!(instance.lookup("index", &Method::GET).is_ok());
        assert!(matches!(
            instance.lookup("missing", &Method::GET),
            Err(LookupError::UnknownAction { .. })
        ));
        assert!(matches!(
            instance.lookup("index", &Method::POST),
            Err(LookupError::UnsupportedVerb { .. })
        ));
        assert_eq!(instance.action_names(), vec!["index"]);
    }
}
