use std::sync::Arc;

use super::backend::Backend;
use crate::models::activity::NewActivity;

#[derive(Clone)]
pub struct ActivityRepository {
    backend: Arc<dyn Backend>,
}

impl ActivityRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn insert(&self, activity: &NewActivity) -> Result<(), anyhow::Error> {
        self.backend
            .insert("activity_log", serde_json::to_value(activity)?)
            .await
    }
}
