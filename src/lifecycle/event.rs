use std::fmt;
use std::str::FromStr;

use super::handler::Handler;

/// The four named extension points around an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Before filters run
    ActionExecuting,
    /// After the action handed control on
    ActionExecuted,
    /// Before the real finishing operation runs
    ResultExecuting,
    /// After the real finishing operation completed
    ResultExecuted,
}

impl LifecycleEvent {
    /// All events, in lifecycle order.
    pub const ALL: [LifecycleEvent; 4] = [
        LifecycleEvent::ActionExecuting,
        LifecycleEvent::ActionExecuted,
        LifecycleEvent::ResultExecuting,
        LifecycleEvent::ResultExecuted,
    ];

    /// Conventional event name (`actionExecuting`, ...).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::ActionExecuting => "actionExecuting",
            LifecycleEvent::ActionExecuted => "actionExecuted",
            LifecycleEvent::ResultExecuting => "resultExecuting",
            LifecycleEvent::ResultExecuted => "resultExecuted",
        }
    }

    const fn index(self) -> usize {
        match self {
            LifecycleEvent::ActionExecuting => 0,
            LifecycleEvent::ActionExecuted => 1,
            LifecycleEvent::ResultExecuting => 2,
            LifecycleEvent::ResultExecuted => 3,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an event name that is not one of the four lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEvent(pub String);

impl fmt::Display for UnknownEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown lifecycle event '{}'", self.0)
    }
}

impl std::error::Error for UnknownEvent {}

impl FromStr for LifecycleEvent {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleEvent::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

/// Ordered listener lists, one per lifecycle event.
#[derive(Clone, Default)]
pub struct EventTable {
    lists: [Vec<Handler>; 4],
}

impl EventTable {
    pub(crate) fn push(&mut self, event: LifecycleEvent, listener: Handler) {
        self.lists[event.index()].push(listener);
    }

    pub(crate) fn extend_from(&mut self, other: &EventTable) {
        for event in LifecycleEvent::ALL {
            self.lists[event.index()].extend(other.listeners(event).iter().cloned());
        }
    }

    /// Listeners registered for `event`, in registration order.
    #[must_use]
    pub fn listeners(&self, event: LifecycleEvent) -> &[Handler] {
        &self.lists[event.index()]
    }

    /// Total number of listeners across all events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in LifecycleEvent::ALL {
            map.entry(&event.as_str(), &self.listeners(event).len());
        }
        map.finish()
    }
}
