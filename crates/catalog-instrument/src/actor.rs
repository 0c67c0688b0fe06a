//! Actor providers and resolution to an audit-safe name.

use catalog_types::{ActorError, ActorProvider, ANONYMOUS_ACTOR};

/// Provider for calls made without an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl ActorProvider for Anonymous {
    fn current_actor_name(&self) -> Result<Option<String>, ActorError> {
        Ok(None)
    }
}

/// Provider that always answers with the same name (service accounts, jobs).
#[derive(Debug, Clone)]
pub struct StaticActor(pub String);

impl StaticActor {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl ActorProvider for StaticActor {
    fn current_actor_name(&self) -> Result<Option<String>, ActorError> {
        Ok(Some(self.0.clone()))
    }
}

/// Resolve the actor for an audit record. Errors, `None` and blank names become `"-"`.
pub fn resolve_actor(provider: &dyn ActorProvider) -> String {
    match provider.current_actor_name() {
        Ok(Some(name)) if !name.trim().is_empty() => name,
        Ok(_) => ANONYMOUS_ACTOR.to_string(),
        Err(e) => {
            tracing::debug!(error = %e, "actor resolution failed, recording anonymous");
            ANONYMOUS_ACTOR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_degrades_to_anonymous() {
        assert_eq!(resolve_actor(&StaticActor::new("alice")), "alice");
        assert_eq!(resolve_actor(&StaticActor::new("   ")), "-");
        assert_eq!(resolve_actor(&Anonymous), "-");
        let failing = || -> Result<Option<String>, ActorError> {
            Err(ActorError::Unavailable("session store down".to_string()))
        };
        assert_eq!(resolve_actor(&failing), "-");
    }
}
