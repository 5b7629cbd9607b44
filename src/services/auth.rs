use crate::repositories::auth::{AuthProvider, Session, INVALID_CREDENTIALS};
use crate::repositories::students::StudentRepository;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LoginError {
    #[error("Invalid Student ID.")]
    UnknownStudent,
    #[error("Invalid Student ID or Password.")]
    InvalidCredentials,
    #[error("{0}")]
    Other(String),
}

fn check_auth(e: anyhow::Error) -> LoginError {
    let message = e.to_string();
    if message == INVALID_CREDENTIALS {
        LoginError::InvalidCredentials
    } else {
        LoginError::Other(message)
    }
}

/// Signs a student in by id: the id is resolved to the email the auth service
/// knows, then a password grant is attempted with it.
pub async fn login(
    students: &StudentRepository,
    auth: &dyn AuthProvider,
    student_id: &str,
    password: &str,
) -> Result<Session, LoginError> {
    let student_id = student_id.trim();

    let email = students
        .email_for_student_id(student_id)
        .await
        .map_err(|e| {
            log::error!("Error resolving student id {}: {}", student_id, e);
            LoginError::Other(e.to_string())
        })?
        .ok_or(LoginError::UnknownStudent)?;

    let session = auth
        .sign_in_with_password(&email, password)
        .await
        .map_err(check_auth)?;

    log::info!("Student {} signed in.", student_id);
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryBackend;
    use serde_json::json;
    use std::sync::Arc;

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.seed(
            "students",
            vec![json!({ "student_id": "S100", "email": "s100@campus.edu", "auth_id": "auth-1" })],
        );
        backend.add_account("s100@campus.edu", "secret1", "auth-1");
        backend
    }

    #[tokio::test]
    async fn signs_in_with_trimmed_student_id() {
        let backend = backend();
        let students = StudentRepository::new(Arc::new(backend.clone()));

        let session = login(&students, &backend, "  S100 ", "secret1").await.unwrap();

        assert_eq!(session.user.id, "auth-1");
        assert!(backend.session().await.is_some());
    }

    #[tokio::test]
    async fn unknown_student_id() {
        let backend = backend();
        let students = StudentRepository::new(Arc::new(backend.clone()));

        let err = login(&students, &backend, "S999", "secret1").await.unwrap_err();

        assert_eq!(err, LoginError::UnknownStudent);
        assert_eq!(err.to_string(), "Invalid Student ID.");
    }

    #[tokio::test]
    async fn wrong_password() {
        let backend = backend();
        let students = StudentRepository::new(Arc::new(backend.clone()));

        let err = login(&students, &backend, "S100", "nope").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid Student ID or Password.");
    }

    #[tokio::test]
    async fn lookup_failure_surfaces_verbatim() {
        let backend = backend();
        backend.fail_reads("get_email_for_student_id");
        let students = StudentRepository::new(Arc::new(backend.clone()));

        let err = login(&students, &backend, "S100", "secret1").await.unwrap_err();

        assert_eq!(
            err,
            LoginError::Other("get_email_for_student_id: call rejected".to_string())
        );
    }
}
