use std::sync::Arc;

use catalogue_core::{Product, ProductId, ValidProduct};
use catalogue_db::{DbError, ProductRepository};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("product {0} not found")]
    NotFound(ProductId),
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Caller identity attached to mutation log lines.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub subject: &'a str,
    pub request_id: &'a str,
}

/// Product use cases over a [`ProductRepository`], enforcing existence checks.
#[derive(Clone)]
pub struct ProductService {
    repo: Arc<dyn ProductRepository>,
}

impl ProductService {
    pub fn new(repo: Arc<dyn ProductRepository>) -> Self {
        Self { repo }
    }

    pub async fn find_all(&self, filter: Option<&str>) -> Result<Vec<Product>, ServiceError> {
        Ok(self.repo.find_all(filter).await?)
    }

    pub async fn find(&self, id: ProductId) -> Result<Product, ServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::NotFound(id))
    }

    pub async fn create(
        &self,
        product: ValidProduct,
        actor: Actor<'_>,
    ) -> Result<Product, ServiceError> {
        let created = self.repo.insert(&product).await?;
        tracing::info!(
            product_id = created.id,
            subject = %actor.subject,
            request_id = %actor.request_id,
            "product created"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        id: ProductId,
        product: ValidProduct,
        actor: Actor<'_>,
    ) -> Result<(), ServiceError> {
        if !self.repo.update(id, &product).await? {
            return Err(ServiceError::NotFound(id));
        }
        tracing::info!(
            product_id = id,
            subject = %actor.subject,
            request_id = %actor.request_id,
            "product updated"
        );
        Ok(())
    }

    pub async fn delete(&self, id: ProductId, actor: Actor<'_>) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::NotFound(id));
        }
        tracing::info!(
            product_id = id,
            subject = %actor.subject,
            request_id = %actor.request_id,
            "product deleted"
        );
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        Ok(self.repo.ping().await?)
    }
}
