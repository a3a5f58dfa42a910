//! Directory service.
//!
//! Plain keyed CRUD for companies, categories and products. The engines
//! read these records; nothing here carries a multi-row invariant.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use tradelink_core::input::{
    AddEmployeeInput, CreateCategoryInput, CreateCompanyInput, CreateProductInput,
    UpdateCompanySettingsInput, UpdateStockInput,
};
use tradelink_core::{
    Actor, Category, Company, CompanySettings, CoreError, EntityId, Product, ProductStatus, Role,
    ValidationError, DEFAULT_REORDER_LEVEL,
};
use tradelink_db::{Database, DbError};

/// A product with its stock status derived at read time.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub status: ProductStatus,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let status = product.status();
        ProductView { product, status }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryService {
    db: Database,
}

impl DirectoryService {
    pub fn new(db: Database) -> Self {
        DirectoryService { db }
    }

    // =========================================================================
    // Companies
    // =========================================================================

    /// Registers a company owned by the calling manufacturer.
    pub async fn create_company(
        &self,
        actor: &Actor,
        input: CreateCompanyInput,
    ) -> ServiceResult<Company> {
        actor.require_role(Role::Manufacturer)?;
        let input = input.validate()?;

        let now = Utc::now();
        let company = Company {
            id: EntityId::generate(),
            name: input.name,
            description: input.description,
            owner_id: actor.user_id.clone(),
            is_public: input.is_public,
            settings: CompanySettings::default(),
            employees: vec![],
            created_at: now,
            updated_at: now,
        };
        self.db.companies().insert(&company).await?;

        info!(company_id = %company.id, owner_id = %company.owner_id, "Company created");
        Ok(company)
    }

    pub async fn get_company(&self, id: &EntityId) -> ServiceResult<Company> {
        Ok(self.db.companies().get_by_id(id).await?)
    }

    /// Companies that accept requests and allow discovery.
    pub async fn list_public_companies(&self) -> ServiceResult<Vec<Company>> {
        Ok(self.db.companies().list_public().await?)
    }

    pub async fn add_employee(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        input: AddEmployeeInput,
    ) -> ServiceResult<Company> {
        actor.require_admin(company_id)?;

        let user = self.db.users().get_by_id(&input.user_id).await?;
        if user.role != Role::Employee {
            return Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec![Role::Employee.to_string()],
            }
            .into());
        }

        self.db
            .companies()
            .add_employee(company_id, &user.id, Utc::now())
            .await?;

        info!(company_id = %company_id, user_id = %user.id, "Employee added");
        self.get_company(company_id).await
    }

    pub async fn update_settings(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        input: UpdateCompanySettingsInput,
    ) -> ServiceResult<Company> {
        actor.require_admin(company_id)?;
        let input = input.validate()?;

        let company = self.db.companies().get_by_id(company_id).await?;
        let mut settings = company.settings;
        if let Some(v) = input.allow_retailer_discovery {
            settings.allow_retailer_discovery = v;
        }
        if let Some(v) = input.auto_approve_requests {
            settings.auto_approve_requests = v;
        }
        if let Some(v) = input.default_credit_limit_paise {
            settings.default_credit_limit_paise = v;
        }
        if let Some(v) = input.default_payment_terms {
            settings.default_payment_terms = v;
        }
        let is_public = input.is_public.unwrap_or(company.is_public);

        self.db
            .companies()
            .update_settings(company_id, is_public, &settings, Utc::now())
            .await?;

        info!(company_id = %company_id, is_public, "Company settings updated");
        self.get_company(company_id).await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        input: CreateCategoryInput,
    ) -> ServiceResult<Category> {
        actor.require_operator(company_id)?;
        let input = input.validate()?;

        let category = Category {
            id: EntityId::generate(),
            company_id: company_id.clone(),
            name: input.name,
            description: input.description,
            created_at: Utc::now(),
        };

        match self.db.categories().insert(&category).await {
            Ok(()) => Ok(category),
            Err(e) if e.is_unique_violation_on("categories.name") => {
                Err(ServiceError::Duplicate("Category name".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_categories(&self, company_id: &EntityId) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().list_by_company(company_id).await?)
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(
        &self,
        actor: &Actor,
        company_id: &EntityId,
        input: CreateProductInput,
    ) -> ServiceResult<Product> {
        actor.require_operator(company_id)?;
        let input = input.validate()?;

        if let Some(category_id) = &input.category_id {
            let category = self.db.categories().get_by_id(category_id).await?;
            if &category.company_id != company_id {
                return Err(CoreError::not_found("Category", category_id).into());
            }
        }

        let now = Utc::now();
        let product = Product {
            id: EntityId::generate(),
            company_id: company_id.clone(),
            category_id: input.category_id,
            name: input.name,
            description: input.description,
            sku: input.sku,
            hsn_code: input.hsn_code,
            unit: input.unit,
            price_paise: input.price_paise,
            available_quantity: input.available_quantity,
            total_shipped: 0,
            reorder_level: input.reorder_level.unwrap_or(DEFAULT_REORDER_LEVEL),
            cgst_rate_bps: input.cgst_rate_bps,
            sgst_rate_bps: input.sgst_rate_bps,
            igst_rate_bps: input.igst_rate_bps,
            cess_rate_bps: input.cess_rate_bps,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.products().insert(&product).await?;

        info!(product_id = %product.id, company_id = %company_id, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: &EntityId) -> ServiceResult<Product> {
        Ok(self.db.products().get_by_id(id).await?)
    }

    pub async fn list_products(&self, company_id: &EntityId) -> ServiceResult<Vec<Product>> {
        Ok(self.db.products().list_by_company(company_id).await?)
    }

    /// Absolute restock. Status is derived from the new quantity on read.
    pub async fn update_stock(
        &self,
        actor: &Actor,
        product_id: &EntityId,
        input: UpdateStockInput,
    ) -> ServiceResult<Product> {
        let input = input.validate()?;
        let product = match self.db.products().get_by_id(product_id).await {
            Ok(p) => p,
            Err(DbError::NotFound { .. }) => {
                return Err(CoreError::not_found("Product", product_id).into())
            }
            Err(e) => return Err(e.into()),
        };
        actor.require_operator(&product.company_id)?;

        self.db
            .products()
            .set_stock(
                product_id,
                input.available_quantity,
                input.reorder_level,
                Utc::now(),
            )
            .await?;

        info!(
            product_id = %product_id,
            available = input.available_quantity,
            "Stock updated"
        );
        self.get_product(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;

    #[tokio::test]
    async fn test_only_manufacturers_create_companies() {
        let h = Harness::new().await;
        let retailer = h.retailer("kirana").await;

        let err = h
            .state
            .directory
            .create_company(
                &retailer,
                CreateCompanyInput {
                    name: "Kirana Co".to_string(),
                    description: None,
                    is_public: true,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_settings_update_merges() {
        let h = Harness::new().await;

        let updated = h
            .state
            .directory
            .update_settings(
                &h.owner,
                &h.company.id,
                UpdateCompanySettingsInput {
                    auto_approve_requests: Some(true),
                    default_credit_limit_paise: Some(5_000_000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.settings.auto_approve_requests);
        assert_eq!(updated.settings.default_credit_limit_paise, 5_000_000);
        assert_eq!(updated.settings.default_payment_terms, "Net 30 days");
        assert!(updated.is_public);
    }

    #[tokio::test]
    async fn test_employee_membership() {
        let h = Harness::new().await;
        let driver = h.user("driver1", Role::Employee).await;
        let retailer = h.retailer("kirana").await;

        let company = h
            .state
            .directory
            .add_employee(
                &h.owner,
                &h.company.id,
                AddEmployeeInput {
                    user_id: driver.user_id.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(company.employees, vec![driver.user_id.clone()]);

        let err = h
            .state
            .directory
            .add_employee(
                &h.owner,
                &h.company.id,
                AddEmployeeInput {
                    user_id: retailer.user_id.clone(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_category() {
        let h = Harness::new().await;
        let input = || CreateCategoryInput {
            name: "Rice".to_string(),
            description: None,
        };

        h.state
            .directory
            .create_category(&h.owner, &h.company.id, input())
            .await
            .unwrap();
        let err = h
            .state
            .directory
            .create_category(&h.owner, &h.company.id, input())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));
        assert_eq!(
            h.state.directory.list_categories(&h.company.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_restock_rederives_status() {
        let h = Harness::new().await;
        let retailer = h.retailer("kirana").await;

        let input = |qty| UpdateStockInput {
            available_quantity: qty,
            reorder_level: None,
        };

        let err = h
            .state
            .directory
            .update_stock(&retailer, &h.product.id, input(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Forbidden(_))));

        let product = h
            .state
            .directory
            .update_stock(&h.owner, &h.product.id, input(0))
            .await
            .unwrap();
        assert_eq!(product.status(), ProductStatus::OutOfStock);

        let product = h
            .state
            .directory
            .update_stock(&h.owner, &h.product.id, input(500))
            .await
            .unwrap();
        assert_eq!(product.status(), ProductStatus::Sufficient);
    }
}
