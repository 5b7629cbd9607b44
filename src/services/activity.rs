use serde_json::Value;

use crate::models::activity::NewActivity;
use crate::repositories::activity::ActivityRepository;

/// Fire-and-forget writer for the `activity_log` table.
///
/// Inserts run on their own task; a failed insert is logged and never reaches
/// the caller.
#[derive(Clone)]
pub struct ActivityLogger {
    repository: ActivityRepository,
}

impl ActivityLogger {
    pub fn new(repository: ActivityRepository) -> Self {
        Self { repository }
    }

    pub fn log(&self, student_id: Option<&str>, activity_type: &str, details: Value) {
        let student_id = match student_id {
            Some(id) => id.to_string(),
            None => return,
        };

        let activity = NewActivity {
            student_id,
            activity_type: activity_type.to_string(),
            details,
        };
        let repository = self.repository.clone();
        tokio::spawn(async move {
            if let Err(e) = repository.insert(&activity).await {
                log::warn!("Error logging activity {}: {}", activity.activity_type, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn writes_activity_for_signed_in_student() {
        let backend = MemoryBackend::new();
        let logger = ActivityLogger::new(ActivityRepository::new(Arc::new(backend.clone())));

        logger.log(Some("S1"), "page_view", json!({ "page": "dashboard" }));
        settle().await;

        let rows = backend.rows("activity_log");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["activity_type"], "page_view");
        assert_eq!(rows[0]["details"]["page"], "dashboard");
    }

    #[tokio::test]
    async fn skips_when_nobody_is_signed_in() {
        let backend = MemoryBackend::new();
        let logger = ActivityLogger::new(ActivityRepository::new(Arc::new(backend.clone())));

        logger.log(None, "page_view", json!({}));
        settle().await;

        assert_eq!(backend.write_count("activity_log"), 0);
    }

    #[tokio::test]
    async fn swallows_insert_failures() {
        let backend = MemoryBackend::new();
        backend.fail_next_write("activity_log");
        let logger = ActivityLogger::new(ActivityRepository::new(Arc::new(backend.clone())));

        logger.log(Some("S1"), "button_click", json!({ "button": "check_in" }));
        settle().await;

        assert_eq!(backend.write_count("activity_log"), 1);
        assert!(backend.rows("activity_log").is_empty());
    }
}
