use async_trait::async_trait;
use tokio::sync::mpsc;

pub mod activity;
pub mod auth;
pub mod loaders;
pub mod portal;
pub mod reconcile;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not signed in.")]
    Unauthenticated,
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Upload error: {0}")]
    Upload(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

#[async_trait]
pub trait RequestHandler<T>: Send + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&mut self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T>,
{
    /// Handles requests strictly one after another: the handler owns its state
    /// and no two requests ever touch it concurrently.
    async fn run(&mut self, mut handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            handler.handle_request(request).await;
        }
    }
}
