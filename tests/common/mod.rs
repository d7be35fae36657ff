#![allow(dead_code)]

pub mod runtime {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

pub mod trace {
    use std::sync::Arc;

    use brrtcontroller::response::{Emission, RecordingSink, ResponseSink};
    use brrtcontroller::{HandlerError, Handler};
    use parking_lot::Mutex;
    use serde_json::Value;

    /// Shared, ordered record of which participants ran.
    #[derive(Clone, Default)]
    pub struct Trace(Arc<Mutex<Vec<String>>>);

    impl Trace {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn record(&self, label: impl Into<String>) {
            self.0.lock().push(label.into());
        }

        pub fn snapshot(&self) -> Vec<String> {
            self.0.lock().clone()
        }

        pub fn count(&self, label: &str) -> usize {
            self.0.lock().iter().filter(|l| l.as_str() == label).count()
        }

        /// Continuation-style participant that records `label` and proceeds.
        pub fn tracer(&self, label: &str) -> Handler {
            let trace = self.clone();
            let label = label.to_string();
            Handler::continuation(move |_cx, next| {
                trace.record(label.clone());
                next.proceed();
                Ok(())
            })
        }

        /// Participant that records `label` and proceeds later from another coroutine.
        pub fn async_tracer(&self, label: &str, delay_ms: u64) -> Handler {
            let trace = self.clone();
            let label = label.to_string();
            Handler::continuation(move |_cx, next| {
                let trace = trace.clone();
                let label = label.clone();
                may::go!(move || {
                    may::coroutine::sleep(std::time::Duration::from_millis(delay_ms));
                    trace.record(label);
                    next.proceed();
                });
                Ok(())
            })
        }

        /// Suspending participant that records `label` after sleeping.
        pub fn suspending_tracer(&self, label: &str, delay_ms: u64) -> Handler {
            let trace = self.clone();
            let label = label.to_string();
            Handler::suspending(move |_cx| {
                may::coroutine::sleep(std::time::Duration::from_millis(delay_ms));
                trace.record(label.clone());
                Ok(())
            })
        }
    }

    /// Sink that records `emit` into a trace in addition to keeping the emission.
    pub struct TraceSink {
        pub trace: Trace,
        pub inner: RecordingSink,
    }

    impl TraceSink {
        pub fn new(trace: &Trace) -> Arc<Self> {
            Arc::new(Self {
                trace: trace.clone(),
                inner: RecordingSink::new(),
            })
        }
    }

    impl ResponseSink for TraceSink {
        fn emit(&self, emission: Emission) -> Result<(), HandlerError> {
            self.trace.record("emit");
            self.inner.emit(emission)
        }

        fn render(&self, view: &str, locals: &Value) -> Result<String, HandlerError> {
            self.inner.render(view, locals)
        }
    }
}

pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use brrtcontroller::lifecycle::{Blueprint, ControllerInstance};
    use brrtcontroller::{ExecutionRequest, Host, Request, ResponseSink};
    use http::Method;

    /// Upper bound for runs that are expected to complete.
    pub const WAIT: Duration = Duration::from_secs(5);

    /// Short deadline for runs that are expected never to complete.
    pub const STALL: Duration = Duration::from_millis(150);

    pub fn instance(blueprint: Arc<Blueprint>) -> Arc<ControllerInstance> {
        Arc::new(ControllerInstance::new(blueprint, Host::new("test-app")))
    }

    pub fn execution(
        instance: &Arc<ControllerInstance>,
        action: &str,
        method: Method,
        sink: Arc<dyn ResponseSink>,
    ) -> ExecutionRequest {
        let request = Request::new(method, format!("/{}/{action}", instance.name()));
        ExecutionRequest::new(Arc::clone(instance), action, request, sink)
    }
}
