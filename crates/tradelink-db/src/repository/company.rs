//! # Company Repository
//!
//! Companies, their connection defaults, and their employee lists.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use tradelink_core::{Company, CompanySettings, EntityId};

const COMPANY_COLUMNS: &str = r#"
    id, name, description, owner_id, is_public,
    allow_retailer_discovery, auto_approve_requests,
    default_credit_limit_paise, default_payment_terms,
    created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    pub async fn insert(&self, company: &Company) -> DbResult<()> {
        debug!(name = %company.name, owner = %company.owner_id, "Inserting company");

        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, description, owner_id, is_public,
                allow_retailer_discovery, auto_approve_requests,
                default_credit_limit_paise, default_payment_terms,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&company.id)
        .bind(&company.name)
        .bind(&company.description)
        .bind(&company.owner_id)
        .bind(company.is_public)
        .bind(company.settings.allow_retailer_discovery)
        .bind(company.settings.auto_approve_requests)
        .bind(company.settings.default_credit_limit_paise)
        .bind(&company.settings.default_payment_terms)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a company with its employee list.
    pub async fn get_by_id(&self, id: &EntityId) -> DbResult<Company> {
        let sql = format!("SELECT {} FROM companies WHERE id = ?", COMPANY_COLUMNS);
        let mut company = sqlx::query_as::<_, Company>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Company", id))?;

        company.employees = sqlx::query_scalar::<_, EntityId>(
            "SELECT user_id FROM company_employees WHERE company_id = ? ORDER BY added_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(company)
    }

    /// Companies retailers may browse and request to join.
    pub async fn list_public(&self) -> DbResult<Vec<Company>> {
        let sql = format!(
            "SELECT {} FROM companies WHERE is_public = 1 AND allow_retailer_discovery = 1 ORDER BY name",
            COMPANY_COLUMNS
        );
        let companies = sqlx::query_as::<_, Company>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(companies)
    }

    /// Adds an employee. Adding an existing employee is a no-op.
    pub async fn add_employee(
        &self,
        company_id: &EntityId,
        user_id: &EntityId,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO company_employees (company_id, user_id, added_at) VALUES (?, ?, ?)",
        )
        .bind(company_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_settings(
        &self,
        id: &EntityId,
        is_public: bool,
        settings: &CompanySettings,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE companies SET
                is_public = ?,
                allow_retailer_discovery = ?,
                auto_approve_requests = ?,
                default_credit_limit_paise = ?,
                default_payment_terms = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(is_public)
        .bind(settings.allow_retailer_discovery)
        .bind(settings.auto_approve_requests)
        .bind(settings.default_credit_limit_paise)
        .bind(&settings.default_payment_terms)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Company", id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::fixtures::{self, Fixture};
    use tradelink_core::Role;

    #[tokio::test]
    async fn test_get_by_id_loads_settings_and_employees() {
        let fx = Fixture::new().await;
        let picker = fx.user("picker", Role::Employee).await;
        let repo = fx.db.companies();

        repo.add_employee(&fx.company.id, &picker.id, Utc::now()).await.unwrap();
        // second add is ignored
        repo.add_employee(&fx.company.id, &picker.id, Utc::now()).await.unwrap();

        let company = repo.get_by_id(&fx.company.id).await.unwrap();
        assert_eq!(company.name, "Sharma Foods");
        assert_eq!(company.settings, CompanySettings::default());
        assert_eq!(company.employees, vec![picker.id]);
    }

    #[tokio::test]
    async fn test_list_public_respects_discovery_flags() {
        let fx = Fixture::new().await;
        let repo = fx.db.companies();

        let mut hidden = fixtures::company(&fx.owner.id, "Private Mills");
        hidden.is_public = false;
        repo.insert(&hidden).await.unwrap();

        let mut undiscoverable = fixtures::company(&fx.owner.id, "Quiet Traders");
        undiscoverable.settings.allow_retailer_discovery = false;
        repo.insert(&undiscoverable).await.unwrap();

        let listed = repo.list_public().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, fx.company.id);
    }

    #[tokio::test]
    async fn test_update_settings() {
        let fx = Fixture::new().await;
        let repo = fx.db.companies();

        let settings = CompanySettings {
            auto_approve_requests: true,
            default_credit_limit_paise: 5_000_000,
            default_payment_terms: "Net 15 days".to_string(),
            ..CompanySettings::default()
        };
        repo.update_settings(&fx.company.id, false, &settings, Utc::now())
            .await
            .unwrap();

        let company = repo.get_by_id(&fx.company.id).await.unwrap();
        assert!(!company.is_public);
        assert_eq!(company.settings, settings);

        let err = repo
            .update_settings(&EntityId::generate(), true, &settings, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
