//! Declarative per-operation metadata.

use catalog_types::{AuditAction, InterceptError};
use std::collections::HashMap;

/// Audit metadata: the action tag and optional static detail text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditSpec {
    pub action: AuditAction,
    pub details: Option<String>,
}

/// What the interceptor does around one operation. Every registered operation is timed;
/// it is audited only when `audit` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSpec {
    pub audit: Option<AuditSpec>,
}

impl OperationSpec {
    pub fn timed() -> Self {
        Self { audit: None }
    }

    pub fn audited(action: AuditAction) -> Self {
        Self {
            audit: Some(AuditSpec {
                action,
                details: None,
            }),
        }
    }

    /// Static detail text prepended to the rendered audit details. No-op for timed-only specs.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        if let Some(ref mut audit) = self.audit {
            audit.details = Some(details.into());
        }
        self
    }

    pub fn is_audited(&self) -> bool {
        self.audit.is_some()
    }
}

/// Operations known to the interceptor, keyed by component then operation name.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    components: HashMap<String, HashMap<String, OperationSpec>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `component.operation`.
    pub fn with(
        mut self,
        component: impl Into<String>,
        operation: impl Into<String>,
        spec: OperationSpec,
    ) -> Self {
        self.register(component, operation, spec);
        self
    }

    pub fn register(
        &mut self,
        component: impl Into<String>,
        operation: impl Into<String>,
        spec: OperationSpec,
    ) {
        self.components
            .entry(component.into())
            .or_default()
            .insert(operation.into(), spec);
    }

    /// Add every operation from `other`; entries in `other` win on conflict.
    pub fn merge(mut self, other: OperationRegistry) -> Self {
        for (component, ops) in other.components {
            let target = self.components.entry(component).or_default();
            target.extend(ops);
        }
        self
    }

    /// Look up an operation, returning the registry-owned names with its spec.
    pub fn resolve(
        &self,
        component: &str,
        operation: &str,
    ) -> Result<(&str, &str, &OperationSpec), InterceptError> {
        self.components
            .get_key_value(component)
            .and_then(|(c, ops)| {
                ops.get_key_value(operation)
                    .map(|(o, spec)| (c.as_str(), o.as_str(), spec))
            })
            .ok_or_else(|| InterceptError::OperationNotFound {
                component: component.to_string(),
                operation: operation.to_string(),
            })
    }

    pub fn contains(&self, component: &str, operation: &str) -> bool {
        self.resolve(component, operation).is_ok()
    }
}
