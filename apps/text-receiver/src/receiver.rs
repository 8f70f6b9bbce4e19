//! Text file sink.
//!
//! Each source gets its own file under the root folder. Batches are
//! appended as a header, one JSON line per record and a separator:
//!
//! ```text
//! DBName: <db>
//! Metric: <metric>
//! {"key":"val"}
//!
//! ===================================
//! ```

use std::path::PathBuf;

use sink_rpc::json::record_to_string;
use sink_rpc::{MeasurementEnvelope, Receiver, Reply, SyncMetricHandler};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tonic::Status;
use tracing::{debug, error};

const SEPARATOR: &str = "===================================";

/// Appends measurement batches to `<root>/<db_name>.txt`.
pub struct TextReceiver {
    root: PathBuf,
    sync: SyncMetricHandler,
}

impl TextReceiver {
    pub fn new(root: impl Into<PathBuf>, sync_capacity: usize) -> Self {
        TextReceiver {
            root: root.into(),
            sync: SyncMetricHandler::new(sync_capacity),
        }
    }

    /// Runs the sync drain loop until the handler is closed.
    pub async fn run_sync_loop(&self) {
        self.sync.handle_sync_metric().await;
    }

    /// Stops the drain loop once the queue is empty.
    pub fn close(&self) {
        self.sync.close();
    }

    fn file_for(&self, db_name: &str) -> Result<PathBuf, Status> {
        // Source names become file names; keep them inside the root folder
        if db_name.contains(['/', '\\']) || db_name == "." || db_name == ".." {
            return Err(Status::invalid_argument(format!(
                "database name {:?} is not a valid file name",
                db_name
            )));
        }
        Ok(self.root.join(format!("{}.txt", db_name)))
    }
}

/// Renders one batch in the on-disk text layout.
pub fn render(envelope: &MeasurementEnvelope) -> String {
    let mut output = format!(
        "DBName: {}\nMetric: {}\n",
        envelope.db_name, envelope.metric_name
    );
    for record in &envelope.data {
        output.push_str(&record_to_string(record));
        output.push('\n');
    }
    output.push('\n');
    output.push_str(SEPARATOR);
    output.push_str("\n\n");
    output
}

#[tonic::async_trait]
impl Receiver for TextReceiver {
    async fn update_measurements(&self, envelope: MeasurementEnvelope) -> Result<Reply, Status> {
        let path = self.file_for(&envelope.db_name)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Unable to open file");
                Status::internal(format!("unable to open file: {}", e))
            })?;

        file.write_all(render(&envelope).as_bytes())
            .await
            .map_err(|e| Status::internal(format!("unable to write file: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| Status::internal(format!("unable to write file: {}", e)))?;

        debug!(
            db_name = %envelope.db_name,
            metric = %envelope.metric_name,
            rows = envelope.data.len(),
            "Batch written"
        );

        Ok(Reply {
            logmsg: format!("Wrote {} rows to {}", envelope.data.len(), path.display()),
        })
    }

    fn sync_handler(&self) -> Option<&SyncMetricHandler> {
        Some(&self.sync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::{value::Kind, Struct, Value};
    use sink_rpc::{SyncOp, SyncReq};
    use tempfile::TempDir;

    fn envelope(db: &str) -> MeasurementEnvelope {
        let mut record = Struct::default();
        record.fields.insert(
            "key".to_string(),
            Value {
                kind: Some(Kind::StringValue("val".to_string())),
            },
        );

        MeasurementEnvelope {
            db_name: db.to_string(),
            metric_name: "testMetric".to_string(),
            custom_tags: Default::default(),
            data: vec![record],
        }
    }

    #[test]
    fn test_render_layout() {
        assert_eq!(
            render(&envelope("test")),
            "DBName: test\nMetric: testMetric\n{\"key\":\"val\"}\n\n===================================\n\n"
        );
    }

    #[tokio::test]
    async fn test_batches_are_appended() {
        let dir = TempDir::new().unwrap();
        let receiver = TextReceiver::new(dir.path(), 16);

        receiver.update_measurements(envelope("test")).await.unwrap();
        receiver.update_measurements(envelope("test")).await.unwrap();
        receiver.update_measurements(envelope("other")).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("test.txt")).unwrap();
        assert_eq!(content.matches("DBName: test").count(), 2);
        assert_eq!(content.matches(SEPARATOR).count(), 2);
        assert!(dir.path().join("other.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_root_is_internal_error() {
        let dir = TempDir::new().unwrap();
        let receiver = TextReceiver::new(dir.path().join("missing"), 16);

        let status = receiver.update_measurements(envelope("test")).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::Internal);
    }

    #[tokio::test]
    async fn test_path_like_db_name_rejected() {
        let dir = TempDir::new().unwrap();
        let receiver = TextReceiver::new(dir.path(), 16);

        for name in ["../escape", "a/b", ".."] {
            let status = receiver.update_measurements(envelope(name)).await.unwrap_err();
            assert_eq!(status.code(), tonic::Code::InvalidArgument);
        }
    }

    #[tokio::test]
    async fn test_sync_requests_drain() {
        let dir = TempDir::new().unwrap();
        let receiver = std::sync::Arc::new(TextReceiver::new(dir.path(), 16));

        let reply = receiver
            .sync_metric(SyncReq {
                db_name: "test".to_string(),
                metric_name: String::new(),
                operation: SyncOp::AddOp as i32,
            })
            .await
            .unwrap();
        assert!(reply.logmsg.ends_with("Operation Add"));

        receiver.close();
        receiver.run_sync_loop().await;
        assert!(receiver.sync_handler().unwrap().is_empty());
    }
}
