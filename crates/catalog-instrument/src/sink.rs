//! Audit sinks: in-memory and JSON-lines file.

use async_trait::async_trait;
use catalog_types::{AuditQuery, AuditRecord, AuditSink, AuditSinkError};
use tokio::io::AsyncWriteExt;

/// Process-lifetime audit log.
pub struct InMemoryAuditSink {
    records: tokio::sync::RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self {
            records: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    pub async fn list(&self, query: &AuditQuery) -> Vec<AuditRecord> {
        let mut out = self.records.read().await.clone();
        query.apply(&mut out);
        out
    }

    /// Last `limit` records, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AuditRecord> {
        self.list(&AuditQuery::recent(limit)).await
    }

    pub async fn by_actor(&self, actor: &str) -> Vec<AuditRecord> {
        self.list(&AuditQuery::by_actor(actor)).await
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        self.records.write().await.push(record);
        Ok(())
    }
}

/// Append-only JSON-lines audit log (survives restarts).
pub struct JsonlAuditSink {
    path: std::path::PathBuf,
    append_lock: tokio::sync::Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            append_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read back the log. Malformed lines are skipped; a missing file is an empty log.
    pub async fn list(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, AuditSinkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AuditSinkError::Other(e.to_string())),
        };
        let mut out: Vec<AuditRecord> = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => out.push(record),
                Err(e) => tracing::debug!(error = %e, "skipping malformed audit line"),
            }
        }
        query.apply(&mut out);
        Ok(out)
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, record: AuditRecord) -> Result<(), AuditSinkError> {
        let _guard = self.append_lock.lock().await;
        let line =
            serde_json::to_string(&record).map_err(|e| AuditSinkError::Other(e.to_string()))?;
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AuditSinkError::Other(e.to_string()))?;
        f.write_all(format!("{}\n", line).as_bytes())
            .await
            .map_err(|e| AuditSinkError::Other(e.to_string()))?;
        f.flush()
            .await
            .map_err(|e| AuditSinkError::Other(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_types::AuditAction;
    use chrono::Utc;

    #[tokio::test]
    async fn in_memory_sink_lists_by_actor() {
        let sink = InMemoryAuditSink::new();
        for (actor, action) in [
            ("alice", AuditAction::Login),
            ("bob", AuditAction::Create),
            ("alice", AuditAction::Logout),
        ] {
            sink.append(AuditRecord::new(actor, action, "", Utc::now()))
                .await
                .unwrap();
        }
        let alice = sink.by_actor("alice").await;
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[0].action, AuditAction::Logout);
        assert_eq!(sink.recent(1).await[0].actor, "alice");
    }

    #[tokio::test]
    async fn jsonl_sink_round_trips_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);
        assert!(sink.list(&AuditQuery::default()).await.unwrap().is_empty());

        let first = AuditRecord::new("alice", AuditAction::Create, "method=create", Utc::now());
        sink.append(first.clone()).await.unwrap();
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .unwrap()
            .write_all(b"not json\n")
            .await
            .unwrap();
        sink.append(AuditRecord::new("bob", AuditAction::Delete, "method=delete", Utc::now()))
            .await
            .unwrap();

        let all = sink.list(&AuditQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].actor, "bob");
        assert_eq!(all[1], first);
    }
}
