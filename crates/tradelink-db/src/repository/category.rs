//! # Category Repository

use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use tradelink_core::{Category, EntityId};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// ## Errors
    /// `UniqueViolation` when the company already has a category of that name.
    pub async fn insert(&self, category: &Category) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO categories (id, company_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&category.id)
        .bind(&category.company_id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, company_id, name, description, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Category", id))
    }

    pub async fn list_by_company(&self, company_id: &EntityId) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, company_id, name, description, created_at
            FROM categories
            WHERE company_id = ?
            ORDER BY name
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
