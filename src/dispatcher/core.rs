use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::LookupError;
use crate::host::Host;
use crate::ids::HostId;
use crate::lifecycle::{Blueprint, ControllerInstance, Engine, ExecutionRequest, PendingRun};
use crate::request::Request;
use crate::response::ResponseSink;

/// Route defaults used when the request's path params don't name a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTarget {
    /// Controller used when the request has no `controller` path param
    pub controller: Option<String>,
    /// Action used when the request has no `action` path param
    pub action: Option<String>,
}

impl RouteTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn controller(mut self, name: impl Into<String>) -> Self {
        self.controller = Some(name.into());
        self
    }

    #[must_use]
    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.action = Some(name.into());
        self
    }
}

/// Why a request could not be handed to the lifecycle engine.
///
/// Both variants mean "no handler here": a caller with more routes should try
/// the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No blueprint is registered under the resolved controller name
    UnknownController {
        /// Name resolved from the request or route
        name: String,
    },
    /// The controller has no matching action or verb handler
    Lookup(LookupError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownController { name } => {
                write!(f, "no handler: unknown controller '{name}'")
            }
            DispatchError::Lookup(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Lookup(err) => Some(err),
            DispatchError::UnknownController { .. } => None,
        }
    }
}

impl From<LookupError> for DispatchError {
    fn from(err: LookupError) -> Self {
        DispatchError::Lookup(err)
    }
}

/// Resolves requests to controller actions and starts lifecycle runs.
///
/// Blueprints are registered once at startup. Controller instances are bound
/// lazily, once per (host, controller), and shared by every later request to
/// that pair.
#[derive(Default)]
pub struct Dispatcher {
    blueprints: HashMap<String, Arc<Blueprint>>,
    instances: DashMap<(HostId, String), Arc<ControllerInstance>>,
    engine: Engine,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blueprint` under its own name.
    pub fn register(&mut self, blueprint: Arc<Blueprint>) {
        let name = blueprint.name().to_string();
        self.register_as(name, blueprint);
    }

    /// Register `blueprint` under `name`, replacing any earlier registration.
    ///
    /// Cached instances of a replaced blueprint are evicted.
    pub fn register_as(&mut self, name: impl Into<String>, blueprint: Arc<Blueprint>) {
        let name = name.into();
        if self.blueprints.insert(name.clone(), blueprint).is_some() {
            self.instances.retain(|(_, controller), _| controller != &name);
            warn!(
                controller = %name,
                "Replaced existing controller blueprint - cached instances evicted"
            );
        }
        info!(
            controller = %name,
            total_controllers = self.blueprints.len(),
            "Controller registered"
        );
    }

    /// Registered controller names, sorted.
    #[must_use]
    pub fn controller_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blueprints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of bound controller instances across all hosts.
    #[must_use]
    pub fn cached_instances(&self) -> usize {
        self.instances.len()
    }

    /// Registered name for `name`: exact match first, then with the host's
    /// controller affix appended (`users` finds `usersController`).
    fn resolve_name(&self, host: &Host, name: &str) -> Option<String> {
        if self.blueprints.contains_key(name) {
            return Some(name.to_string());
        }
        let affixed = format!("{name}{}", host.settings().controller_name_affix);
        self.blueprints.contains_key(&affixed).then_some(affixed)
    }

    /// Controller instance for `name` on `host`, binding it on first use.
    pub fn instance(
        &self,
        host: &Arc<Host>,
        name: &str,
    ) -> Result<Arc<ControllerInstance>, DispatchError> {
        let resolved = self
            .resolve_name(host, name)
            .ok_or_else(|| DispatchError::UnknownController {
                name: name.to_string(),
            })?;
        let key = (host.id(), resolved);
        if let Some(instance) = self.instances.get(&key) {
            return Ok(Arc::clone(instance.value()));
        }
        let blueprint = self
            .blueprints
            .get(&key.1)
            .ok_or_else(|| DispatchError::UnknownController {
                name: name.to_string(),
            })?;
        let entry = self.instances.entry(key).or_insert_with(|| {
            Arc::new(ControllerInstance::new(
                Arc::clone(blueprint),
                Arc::clone(host),
            ))
        });
        Ok(Arc::clone(entry.value()))
    }

    /// Build the execution request for `request` without starting it.
    pub fn prepare(
        &self,
        host: &Arc<Host>,
        request: Request,
        target: &RouteTarget,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<ExecutionRequest, DispatchError> {
        let settings = host.settings();
        let controller_name = request
            .path_param("controller")
            .map(str::to_string)
            .or_else(|| target.controller.clone())
            .ok_or_else(|| DispatchError::UnknownController {
                name: String::new(),
            })?;
        let action = request
            .path_param("action")
            .map(str::to_string)
            .or_else(|| target.action.clone())
            .unwrap_or_else(|| settings.default_action.clone());

        let instance = self.instance(host, &controller_name)?;
        let view_path = settings.view_path(&controller_name, &action);

        debug!(
            request_id = %request.request_id,
            host = %host.name(),
            controller = %instance.name(),
            action = %action,
            verb = %request.method,
            view_path = %view_path.display(),
            "Request resolved to controller action"
        );

        Ok(ExecutionRequest::new(instance, action, request, sink).with_view_path(view_path))
    }

    /// Resolve `request` and start its lifecycle run.
    ///
    /// Unknown controllers, actions and verbs are reported immediately,
    /// before any lifecycle phase runs.
    pub fn dispatch(
        &self,
        host: &Arc<Host>,
        request: Request,
        target: &RouteTarget,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<PendingRun, DispatchError> {
        let execution = self.prepare(host, request, target, sink)?;
        Ok(self.engine.execute(execution)?)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("controllers", &self.controller_names())
            .field("cached_instances", &self.instances.len())
            .finish()
    }
}
