//! JSON-lines command driver over any async reader/writer pair.
//!
//! One command object per input line, tagged by `"cmd"`; one `{"ok": ...}` or
//! `{"error": "..."}` object per output line. The logged-in session is local state of the
//! driver and is handed explicitly to every catalog call.

use crate::app::App;
use catalog_instrument::Anonymous;
use catalog_service::{paginate, Session};
use catalog_types::{
    ActorProvider, AuditAction, AuditQuery, AuditRecord, AuditSinkError, AuthError, CatalogError,
    PageRequest, Product, ProductId, Role, SearchFilter,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Page size used when only `page` is given.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    Login {
        username: String,
        password: String,
    },
    Logout,
    Register {
        username: String,
        password: String,
    },
    Create {
        product: Product,
    },
    Update {
        product: Product,
    },
    Delete {
        id: ProductId,
    },
    Get {
        id: ProductId,
    },
    List {
        #[serde(default)]
        page: Option<i64>,
        #[serde(default)]
        size: Option<i64>,
    },
    Search {
        #[serde(default)]
        filter: SearchFilter,
        #[serde(default)]
        page: Option<i64>,
        #[serde(default)]
        size: Option<i64>,
    },
    Metrics,
    Persist,
    Audit {
        #[serde(default)]
        limit: Option<usize>,
        #[serde(default)]
        actor: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("invalid command: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("not logged in")]
    NotLoggedIn,
    #[error("admin role required")]
    Forbidden,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Audit(#[from] AuditSinkError),
}

fn page_request(page: Option<i64>, size: Option<i64>) -> Result<Option<PageRequest>, CatalogError> {
    if page.is_none() && size.is_none() {
        return Ok(None);
    }
    PageRequest::new(page.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE)).map(Some)
}

pub struct Driver<'a> {
    app: &'a App,
    session: Option<Session>,
}

impl<'a> Driver<'a> {
    pub fn new(app: &'a App) -> Self {
        Self { app, session: None }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&Session, DriverError> {
        self.session.as_ref().ok_or(DriverError::NotLoggedIn)
    }

    fn require_admin(&self) -> Result<&Session, DriverError> {
        let session = self.require_session()?;
        if !session.is_admin() {
            return Err(DriverError::Forbidden);
        }
        Ok(session)
    }

    pub async fn execute(&mut self, command: Command) -> Result<Value, DriverError> {
        let app = self.app;
        match command {
            Command::Login { username, password } => {
                let session = app.auth.login(&username, &password).await?;
                let out = json!({ "username": session.username, "role": session.role });
                self.session = Some(session);
                Ok(out)
            }
            Command::Logout => {
                let session = self.session.take().ok_or(DriverError::NotLoggedIn)?;
                let username = session.username.clone();
                app.auth.logout(session).await?;
                Ok(json!({ "logged_out": username }))
            }
            Command::Register { username, password } => {
                let actor: &dyn ActorProvider = match self.session.as_ref() {
                    Some(session) => session,
                    None => &Anonymous,
                };
                app.auth
                    .register(actor, &username, &password, Role::User)
                    .await?;
                Ok(json!({ "registered": username.trim() }))
            }
            Command::Create { product } => {
                let session = self.require_admin()?;
                let saved = app.catalog.create(session, product).await?;
                Ok(json!(saved))
            }
            Command::Update { product } => {
                let session = self.require_admin()?;
                let saved = app.catalog.update(session, product).await?;
                Ok(json!(saved))
            }
            Command::Delete { id } => {
                let session = self.require_admin()?;
                let removed = app.catalog.delete(session, id).await?;
                Ok(json!({ "id": id, "removed": removed }))
            }
            Command::Get { id } => {
                let session = self.require_session()?;
                let product = app
                    .catalog
                    .get(session, id)
                    .await?
                    .ok_or(CatalogError::NotFound { id: Some(id) })?;
                Ok(json!(product))
            }
            Command::List { page, size } => {
                let session = self.require_session()?;
                let page = page_request(page, size)?;
                let all = app.catalog.list_all(session).await?;
                let items = match page {
                    Some(page) => paginate(&all, page),
                    None => all,
                };
                Ok(json!(items))
            }
            Command::Search { filter, page, size } => {
                let session = self.require_session()?;
                let results = match page_request(page, size)? {
                    Some(page) => app.catalog.search_page(session, &filter, page).await?,
                    None => app.catalog.search(session, &filter).await?,
                };
                app.record(AuditRecord::new(
                    session.username.clone(),
                    AuditAction::Search,
                    format!("{}, results={}", filter, results.len()),
                    app.clock().utc_now(),
                ));
                Ok(json!(results))
            }
            Command::Metrics => {
                self.require_session()?;
                Ok(json!({
                    "metrics": app.catalog.metrics_snapshot(),
                    "cache": app.catalog.cache_stats(),
                }))
            }
            Command::Persist => {
                let session = self.require_session()?;
                app.catalog.persist(session).await?;
                Ok(json!({ "persisted": true }))
            }
            Command::Audit { limit, actor } => {
                self.require_admin()?;
                let query = AuditQuery {
                    actor,
                    limit,
                    ..AuditQuery::default()
                };
                let records = app.audit_trail(&query).await?;
                Ok(json!(records))
            }
        }
    }

    /// Parse and run one line, producing the response object.
    pub async fn handle_line(&mut self, line: &str) -> Value {
        let result = match serde_json::from_str::<Command>(line) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(DriverError::from(e)),
        };
        match result {
            Ok(value) => json!({ "ok": value }),
            Err(e) => {
                tracing::debug!(error = %e, "command failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    /// Serve until the reader is exhausted. Blank lines are ignored.
    pub async fn run<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line).await;
            writer
                .write_all(format!("{}\n", response).as_bytes())
                .await?;
            writer.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: Command = serde_json::from_str(
            r#"{"cmd":"search","filter":{"brand":"apple"},"page":1,"size":2}"#,
        )
        .unwrap();
        match cmd {
            Command::Search { filter, page, size } => {
                assert_eq!(filter, SearchFilter::new().brand("apple"));
                assert_eq!((page, size), (Some(1), Some(2)));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            serde_json::from_str::<Command>(r#"{"cmd":"logout"}"#).unwrap(),
            Command::Logout
        ));
        assert!(serde_json::from_str::<Command>(r#"{"cmd":"explode"}"#).is_err());
    }

    #[test]
    fn page_request_defaults() {
        assert_eq!(page_request(None, None).unwrap(), None);
        assert_eq!(
            page_request(Some(2), None).unwrap(),
            Some(PageRequest::new(2, DEFAULT_PAGE_SIZE).unwrap())
        );
        assert!(page_request(None, Some(0)).is_err());
    }
}
