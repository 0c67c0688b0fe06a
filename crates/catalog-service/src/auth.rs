//! User registration and login. Sessions are plain values handed back to the caller.

use catalog_instrument::{Interceptor, OperationRegistry, OperationSpec, StaticActor};
use catalog_types::{ActorError, ActorProvider, AuditAction, AuthError, Role, User};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const AUTH_COMPONENT: &str = "auth";

pub fn auth_operations() -> OperationRegistry {
    OperationRegistry::new()
        .with(AUTH_COMPONENT, "login", OperationSpec::audited(AuditAction::Login))
        .with(AUTH_COMPONENT, "logout", OperationSpec::audited(AuditAction::Logout))
        .with(AUTH_COMPONENT, "register", OperationSpec::audited(AuditAction::Register))
        .with(AUTH_COMPONENT, "exists", OperationSpec::timed())
}

/// An authenticated user. Acts as the actor for the calls it is passed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl ActorProvider for Session {
    fn current_actor_name(&self) -> Result<Option<String>, ActorError> {
        Ok(Some(self.username.clone()))
    }
}

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub struct AuthService {
    users: RwLock<HashMap<String, User>>,
    interceptor: Interceptor,
}

impl AuthService {
    pub fn new(interceptor: Interceptor) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            interceptor,
        }
    }

    /// Seeded with `admin`/`admin` (ADMIN) and `user`/`user` (USER).
    pub fn with_default_users(interceptor: Interceptor) -> Self {
        let users = [("admin", Role::Admin), ("user", Role::User)]
            .into_iter()
            .map(|(name, role)| {
                (
                    name.to_string(),
                    User {
                        username: name.to_string(),
                        password_hash: hash_password(name),
                        role,
                    },
                )
            })
            .collect();
        Self {
            users: RwLock::new(users),
            interceptor,
        }
    }

    pub async fn register(
        &self,
        actor: &dyn ActorProvider,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), AuthError> {
        let op = self.interceptor.operation(AUTH_COMPONENT, "register")?;
        let username = username.trim();
        op.run(actor, &[&username, &role], async {
            if username.is_empty() || password.is_empty() {
                return Err(AuthError::Validation(
                    "username and password must not be blank".to_string(),
                ));
            }
            let mut users = self.users.write().await;
            if users.contains_key(username) {
                return Err(AuthError::Validation(format!(
                    "user '{}' already exists",
                    username
                )));
            }
            users.insert(
                username.to_string(),
                User {
                    username: username.to_string(),
                    password_hash: hash_password(password),
                    role,
                },
            );
            tracing::info!(username, role = %role, "user registered");
            Ok(())
        })
        .await
    }

    /// The login is attributed to the user logging in. Only the username is recorded.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let op = self.interceptor.operation(AUTH_COMPONENT, "login")?;
        let actor = StaticActor::new(username);
        op.run(&actor, &[&username], async {
            let users = self.users.read().await;
            match users.get(username) {
                Some(user) if user.password_hash == hash_password(password) => Ok(Session {
                    username: user.username.clone(),
                    role: user.role,
                }),
                _ => Err(AuthError::InvalidCredentials),
            }
        })
        .await
    }

    pub async fn logout(&self, session: Session) -> Result<(), AuthError> {
        self.interceptor
            .operation(AUTH_COMPONENT, "logout")?
            .run(&session, &[], async { Ok::<(), AuthError>(()) })
            .await
    }

    pub async fn exists(
        &self,
        actor: &dyn ActorProvider,
        username: &str,
    ) -> Result<bool, AuthError> {
        self.interceptor
            .operation(AUTH_COMPONENT, "exists")?
            .run(actor, &[&username], async {
                Ok(self.users.read().await.contains_key(username))
            })
            .await
    }
}
