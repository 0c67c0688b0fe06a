//! The interceptor: timing around every registered operation, audit after success.

use crate::actor::resolve_actor;
use crate::dispatcher::AuditDispatcher;
use crate::registry::{AuditSpec, OperationRegistry, OperationSpec};
use catalog_types::{ActorProvider, AuditRecord, Clock, InterceptError, SystemClock};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// One argument of an intercepted call, rendered with `Display` into audit details.
pub type CallArg<'a> = &'a (dyn fmt::Display + Sync);

/// Timing of one intercepted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTiming {
    pub component: String,
    pub operation: String,
    pub duration: Duration,
    pub success: bool,
}

/// Receives a [`CallTiming`] after every intercepted call, successful or not.
pub trait TimingSink: Send + Sync {
    fn record(&self, timing: &CallTiming);
}

/// Writes timings to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTimingSink;

impl TimingSink for LogTimingSink {
    fn record(&self, timing: &CallTiming) {
        tracing::info!(
            component = %timing.component,
            operation = %timing.operation,
            duration_ms = timing.duration.as_millis() as u64,
            success = timing.success,
            "call completed"
        );
    }
}

/// Keeps every timing in memory, for exporters and tests.
#[derive(Debug, Default)]
pub struct RecordingTimingSink {
    timings: Mutex<Vec<CallTiming>>,
}

impl RecordingTimingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timings(&self) -> Vec<CallTiming> {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TimingSink for RecordingTimingSink {
    fn record(&self, timing: &CallTiming) {
        self.timings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timing.clone());
    }
}

/// Audit details: `"<detail> | "` when static detail text is set, then `method=<name>`,
/// then `, args=[a, b]` when there are arguments. Arguments are not truncated or redacted.
pub fn render_details(audit: &AuditSpec, operation: &str, args: &[CallArg<'_>]) -> String {
    let mut out = String::new();
    if let Some(details) = audit.details.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(details);
        out.push_str(" | ");
    }
    out.push_str("method=");
    out.push_str(operation);
    if !args.is_empty() {
        let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        out.push_str(", args=[");
        out.push_str(&rendered.join(", "));
        out.push(']');
    }
    out
}

/// Decorator applied uniformly to any registered async operation.
#[derive(Clone)]
pub struct Interceptor {
    registry: Arc<OperationRegistry>,
    audit: AuditDispatcher,
    timings: Arc<dyn TimingSink>,
    clock: Arc<dyn Clock>,
}

impl Interceptor {
    pub fn new(registry: OperationRegistry, audit: AuditDispatcher) -> Self {
        Self {
            registry: Arc::new(registry),
            audit,
            timings: Arc::new(LogTimingSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timing_sink(mut self, timings: Arc<dyn TimingSink>) -> Self {
        self.timings = timings;
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &AuditDispatcher {
        &self.audit
    }

    /// Bind to a registered operation. An unknown name is a wiring error, not a call failure.
    pub fn operation(
        &self,
        component: &str,
        operation: &str,
    ) -> Result<BoundOperation<'_>, InterceptError> {
        let (component, operation, spec) = self.registry.resolve(component, operation)?;
        Ok(BoundOperation {
            interceptor: self,
            component,
            operation,
            spec,
        })
    }

    /// Resolve and run in one step. The outer `Result` is the wiring check; the inner one is
    /// the operation's own result, untouched.
    pub async fn call<T, E, Fut>(
        &self,
        component: &str,
        operation: &str,
        actor: &dyn ActorProvider,
        args: &[CallArg<'_>],
        fut: Fut,
    ) -> Result<Result<T, E>, InterceptError>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let bound = self.operation(component, operation)?;
        Ok(bound.run(actor, args, fut).await)
    }
}

/// A resolved operation, ready to wrap one invocation.
pub struct BoundOperation<'a> {
    interceptor: &'a Interceptor,
    component: &'a str,
    operation: &'a str,
    spec: &'a OperationSpec,
}

impl BoundOperation<'_> {
    pub fn spec(&self) -> &OperationSpec {
        self.spec
    }

    /// Time `fut`, report the timing, and on success queue an audit record when the
    /// operation is auditable. Returns exactly what `fut` returned.
    pub async fn run<T, E, Fut>(
        self,
        actor: &dyn ActorProvider,
        args: &[CallArg<'_>],
        fut: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let clock = &self.interceptor.clock;
        let start = clock.now();
        let result = fut.await;
        let duration = clock.now().saturating_duration_since(start);

        self.interceptor.timings.record(&CallTiming {
            component: self.component.to_string(),
            operation: self.operation.to_string(),
            duration,
            success: result.is_ok(),
        });

        if result.is_ok() {
            if let Some(audit) = self.spec.audit.as_ref() {
                let record = AuditRecord::new(
                    resolve_actor(actor),
                    audit.action,
                    render_details(audit, self.operation, args),
                    clock.utc_now(),
                );
                self.interceptor.audit.dispatch(record);
            }
        }
        result
    }
}
