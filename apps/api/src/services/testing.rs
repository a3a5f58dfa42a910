//! Shared fixtures for service tests: an in-memory database, one manufacturer
//! with a public company and a stocked product.
//!
//! Race tests also run on a file database with several pooled connections,
//! where SQLite writers really contend for the lock.

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use crate::config::ApiConfig;
use crate::error::ServiceError;
use crate::AppState;
use tradelink_core::input::{
    CreateCompanyInput, CreateProductInput, LineItemInput, PlaceOrderInput,
    UpdateConnectionStatusInput,
};
use tradelink_core::{
    Actor, Company, Connection, ConnectionStatus, CoreError, DeliveryAddress, EntityId,
    PaymentMethod, Product, Role, User,
};
use tradelink_db::{ConnectionRepository, Database, DbConfig};

/// Unwraps the business error inside a service error.
pub(crate) fn core_err(err: ServiceError) -> CoreError {
    match err {
        ServiceError::Core(e) => e,
        other => panic!("expected a core error, got {other:?}"),
    }
}

pub(crate) struct Harness {
    pub state: Arc<AppState>,
    pub owner: Actor,
    pub company: Company,
    /// ₹500.00, 20 in stock, 9% + 9% GST.
    pub product: Product,
}

/// Connections in the file-backed pool.
const FILE_POOL_CONNECTIONS: u32 = 5;

/// A file database in `dir` with a multi-connection pool.
pub(crate) async fn file_database(dir: &TempDir) -> Database {
    Database::new(
        DbConfig::new(dir.path().join("tradelink.db")).max_connections(FILE_POOL_CONNECTIONS),
    )
    .await
    .unwrap()
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_db(Database::new(DbConfig::in_memory()).await.unwrap()).await
    }

    /// A harness over [`file_database`].
    pub async fn on_file(dir: &TempDir) -> Self {
        Self::with_db(file_database(dir).await).await
    }

    pub async fn with_db(db: Database) -> Self {
        let config = ApiConfig::from_lookup(|_| None).unwrap();
        let state = Arc::new(AppState::new(config, db));

        let (owner, company) = manufacturer(&state, "basmati_mills", "Basmati Mills").await;
        let product = state
            .directory
            .create_product(&owner, &company.id, product_input(50_000, 20, 900, 900))
            .await
            .unwrap();

        Harness {
            state,
            owner,
            company,
            product,
        }
    }

    /// Inserts an active user and returns it as a bare actor.
    pub async fn user(&self, username: &str, role: Role) -> Actor {
        let user = insert_user(&self.state.db, username, role).await;
        Actor::new(user.id, user.role, vec![])
    }

    pub async fn retailer(&self, username: &str) -> Actor {
        self.user(username, Role::Retailer).await
    }

    /// A retailer with an approved connection to the harness company.
    pub async fn connected_retailer(&self, username: &str) -> Actor {
        let retailer = self.retailer(username).await;
        let now = Utc::now();
        let connection = Connection {
            id: EntityId::generate(),
            company_id: self.company.id.clone(),
            retailer_id: retailer.user_id.clone(),
            status: ConnectionStatus::Approved,
            credit_limit_paise: 0,
            payment_terms: self.company.settings.default_payment_terms.clone(),
            approved_by: self.owner.user_id.clone(),
            approved_at: now,
            suspended_by: None,
            suspended_at: None,
            suspension_reason: None,
            total_orders: 0,
            total_order_value_paise: 0,
            last_order_date: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.state.db.begin().await.unwrap();
        ConnectionRepository::insert(&mut tx, &connection).await.unwrap();
        tx.commit().await.unwrap();
        retailer
    }

    /// Suspends the retailer's connection to the harness company.
    pub async fn suspend(&self, retailer: &Actor) {
        let connection = self
            .state
            .db
            .connections()
            .find_by_pair(&self.company.id, &retailer.user_id)
            .await
            .unwrap()
            .unwrap();
        self.state
            .connections
            .set_connection_status(
                &self.owner,
                &connection.id,
                UpdateConnectionStatusInput {
                    status: ConnectionStatus::Suspended,
                    reason: Some("Credit review".to_string()),
                    credit_limit_paise: None,
                    payment_terms: None,
                },
            )
            .await
            .unwrap();
    }

    pub async fn product_priced(
        &self,
        price_paise: i64,
        quantity: i64,
        cgst_bps: u32,
        sgst_bps: u32,
    ) -> Product {
        self.state
            .directory
            .create_product(
                &self.owner,
                &self.company.id,
                product_input(price_paise, quantity, cgst_bps, sgst_bps),
            )
            .await
            .unwrap()
    }

    /// A product in some other manufacturer's catalog.
    pub async fn foreign_product(&self) -> EntityId {
        let (owner, company) = manufacturer(&self.state, "rival_foods", "Rival Foods").await;
        self.state
            .directory
            .create_product(&owner, &company.id, product_input(10_000, 100, 250, 250))
            .await
            .unwrap()
            .id
    }

    pub async fn stock(&self, product_id: &EntityId) -> i64 {
        self.state
            .db
            .products()
            .get_by_id(product_id)
            .await
            .unwrap()
            .available_quantity
    }

    pub async fn token_for(&self, user_id: &EntityId) -> String {
        let user = self.state.db.users().get_by_id(user_id).await.unwrap();
        self.state.jwt.generate_access_token(&user).unwrap()
    }

    pub fn order_input(&self, product_id: &EntityId, quantity: i64) -> PlaceOrderInput {
        PlaceOrderInput {
            company_id: self.company.id.clone(),
            retailer_id: None,
            items: vec![LineItemInput {
                product_id: product_id.clone(),
                quantity,
                unit_price_paise: None,
            }],
            delivery_address: address(),
            payment_method: PaymentMethod::Credit,
            delivery_notes: None,
            notes: None,
            expected_delivery_date: None,
        }
    }
}

async fn insert_user(db: &Database, username: &str, role: Role) -> User {
    let now = Utc::now();
    let user = User {
        id: EntityId::generate(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        role,
        first_name: None,
        last_name: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&user, "not-a-real-hash").await.unwrap();
    user
}

/// A manufacturer owning a fresh public company, with its membership loaded.
async fn manufacturer(state: &AppState, username: &str, company: &str) -> (Actor, Company) {
    let user = insert_user(&state.db, username, Role::Manufacturer).await;
    let bare = Actor::new(user.id.clone(), user.role, vec![]);

    let company = state
        .directory
        .create_company(
            &bare,
            CreateCompanyInput {
                name: company.to_string(),
                description: None,
                is_public: true,
            },
        )
        .await
        .unwrap();

    let memberships = state.db.users().memberships(&user.id).await.unwrap();
    (Actor::new(user.id, user.role, memberships), company)
}

fn product_input(price_paise: i64, quantity: i64, cgst_bps: u32, sgst_bps: u32) -> CreateProductInput {
    CreateProductInput {
        name: format!("Sona Masoori {}", EntityId::generate().short_suffix(4)),
        description: None,
        category_id: None,
        sku: None,
        hsn_code: Some("1006".to_string()),
        unit: "KG".to_string(),
        price_paise,
        available_quantity: quantity,
        reorder_level: None,
        cgst_rate_bps: cgst_bps,
        sgst_rate_bps: sgst_bps,
        igst_rate_bps: 0,
        cess_rate_bps: 0,
    }
}

fn address() -> DeliveryAddress {
    DeliveryAddress {
        address_line1: "14 Laxmi Road".to_string(),
        address_line2: None,
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        pincode: "411030".to_string(),
        country: "India".to_string(),
    }
}
