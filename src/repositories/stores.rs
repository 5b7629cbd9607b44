use std::sync::Arc;

use super::backend::{select_as, Backend, Query};
use crate::models::stores::{Product, Store};

#[derive(Clone)]
pub struct StoreRepository {
    backend: Arc<dyn Backend>,
}

impl StoreRepository {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn stores(&self) -> Result<Vec<Store>, anyhow::Error> {
        select_as(self.backend.as_ref(), "stores", &Query::new()).await
    }

    pub async fn products(&self) -> Result<Vec<Product>, anyhow::Error> {
        select_as(self.backend.as_ref(), "products", &Query::new()).await
    }
}
