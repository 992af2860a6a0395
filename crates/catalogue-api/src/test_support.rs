//! In-memory repository double for handler and service tests.

use async_trait::async_trait;
use catalogue_core::{Product, ProductId, ValidProduct};
use catalogue_db::{DbError, ProductRepository};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_id: ProductId,
    products: Vec<Product>,
}

impl InMemoryProductRepository {
    /// Seed products with ids 1.. and details `Описание <title>`.
    pub fn with_titles(titles: &[&str]) -> Self {
        let products: Vec<Product> = titles
            .iter()
            .zip(1..)
            .map(|(title, id)| Product {
                id,
                title: (*title).to_string(),
                details: Some(format!("Описание {title}")),
            })
            .collect();
        Self {
            state: Mutex::new(State {
                next_id: ProductId::try_from(products.len()).unwrap_or(0) + 1,
                products,
            }),
        }
    }

    pub async fn snapshot(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_all(&self, filter: Option<&str>) -> Result<Vec<Product>, DbError> {
        let state = self.state.lock().await;
        let needle = filter.map(str::to_lowercase);
        Ok(state
            .products
            .iter()
            .filter(|p| {
                needle
                    .as_deref()
                    .is_none_or(|n| p.title.to_lowercase().contains(n))
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, DbError> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert(&self, product: &ValidProduct) -> Result<Product, DbError> {
        let mut state = self.state.lock().await;
        let created = Product {
            id: state.next_id.max(1),
            title: product.title.clone(),
            details: product.details.clone(),
        };
        state.next_id = created.id + 1;
        state.products.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: ProductId, product: &ValidProduct) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        let Some(existing) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        existing.title.clone_from(&product.title);
        existing.details.clone_from(&product.details);
        Ok(true)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        Ok(state.products.len() < before)
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}
