use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct NewActivity {
    pub student_id: String,
    pub activity_type: String,
    pub details: serde_json::Value,
}
