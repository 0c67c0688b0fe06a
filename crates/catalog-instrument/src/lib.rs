//! Call interception for business operations.
//!
//! An [`Interceptor`] wraps any async operation registered in an [`OperationRegistry`]:
//! it times the call, reports the timing to a [`TimingSink`], and for auditable
//! operations hands an `AuditRecord` to the background [`AuditDispatcher`] once the
//! call has succeeded. The wrapped operation's result or error is returned unchanged.

mod actor;
mod dispatcher;
mod interceptor;
mod registry;
mod sink;

pub use actor::{resolve_actor, Anonymous, StaticActor};
pub use catalog_types::{ActorProvider, AuditSink, InterceptError};
pub use dispatcher::{AuditDispatcher, DEFAULT_AUDIT_QUEUE};
pub use interceptor::{
    render_details, BoundOperation, CallArg, CallTiming, Interceptor, LogTimingSink,
    RecordingTimingSink, TimingSink,
};
pub use registry::{AuditSpec, OperationRegistry, OperationSpec};
pub use sink::{InMemoryAuditSink, JsonlAuditSink};
