use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};

use super::backend::{select_as, Backend, Query};
use crate::models::students::Student;

#[derive(Clone)]
pub struct StudentRepository {
    backend: Arc<dyn Backend>,
}

impl StudentRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn get_student_by_auth_id(
        &self,
        auth_id: &str,
    ) -> Result<Option<Student>, anyhow::Error> {
        let students: Vec<Student> = select_as(
            self.backend.as_ref(),
            "students",
            &Query::new().eq("auth_id", auth_id),
        )
        .await?;

        Ok(students.into_iter().next())
    }

    pub async fn set_last_check_in(
        &self,
        student_id: &str,
        date: NaiveDate,
    ) -> Result<(), anyhow::Error> {
        self.backend
            .update(
                "students",
                &Query::new().eq("student_id", student_id),
                json!({ "last_check_in_date": date }),
            )
            .await
    }

    pub async fn set_avatar_url(&self, student_id: &str, url: &str) -> Result<(), anyhow::Error> {
        self.backend
            .update(
                "students",
                &Query::new().eq("student_id", student_id),
                json!({ "avatar_url": url }),
            )
            .await
    }

    /// Resolves a student id to the email the auth service knows them by.
    pub async fn email_for_student_id(
        &self,
        student_id: &str,
    ) -> Result<Option<String>, anyhow::Error> {
        let email = self
            .backend
            .rpc(
                "get_email_for_student_id",
                json!({ "p_student_id": student_id }),
            )
            .await?;

        Ok(match email {
            Value::String(email) if !email.is_empty() => Some(email),
            _ => None,
        })
    }
}
