//! Row builders shared by the repository tests.

use chrono::{Duration, Utc};

use crate::pool::{Database, DbConfig};
use crate::repository::{ConnectionRepository, OrderRepository};
use tradelink_core::{
    Company, CompanySettings, Connection, ConnectionStatus, DeliveryAddress, EntityId, LineItem,
    LedgerTotals, Order, OrderStatus, PaymentMethod, Product, Role, User,
};

pub(crate) fn user(username: &str, role: Role) -> User {
    let now = Utc::now();
    User {
        id: EntityId::generate(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        role,
        first_name: None,
        last_name: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn company(owner_id: &EntityId, name: &str) -> Company {
    let now = Utc::now();
    Company {
        id: EntityId::generate(),
        name: name.to_string(),
        description: None,
        owner_id: owner_id.clone(),
        is_public: true,
        settings: CompanySettings::default(),
        employees: vec![],
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn product(company_id: &EntityId, price_paise: i64, available: i64) -> Product {
    let now = Utc::now();
    Product {
        id: EntityId::generate(),
        company_id: company_id.clone(),
        category_id: None,
        name: "Basmati 5kg".to_string(),
        description: None,
        sku: Some("BAS-5".to_string()),
        hsn_code: Some("1006".to_string()),
        unit: "PACK".to_string(),
        price_paise,
        available_quantity: available,
        total_shipped: 0,
        reorder_level: 10,
        cgst_rate_bps: 250,
        sgst_rate_bps: 250,
        igst_rate_bps: 0,
        cess_rate_bps: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn connection(company: &Company, retailer_id: &EntityId) -> Connection {
    let now = Utc::now();
    Connection {
        id: EntityId::generate(),
        company_id: company.id.clone(),
        retailer_id: retailer_id.clone(),
        status: ConnectionStatus::Approved,
        credit_limit_paise: 0,
        payment_terms: company.settings.default_payment_terms.clone(),
        approved_by: company.owner_id.clone(),
        approved_at: now,
        suspended_by: None,
        suspended_at: None,
        suspension_reason: None,
        total_orders: 0,
        total_order_value_paise: 0,
        last_order_date: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn address() -> DeliveryAddress {
    DeliveryAddress {
        address_line1: "12 MG Road".to_string(),
        address_line2: None,
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        pincode: "411001".to_string(),
        country: "India".to_string(),
    }
}

pub(crate) fn order(company_id: &EntityId, retailer_id: &EntityId, items: Vec<LineItem>) -> Order {
    let now = Utc::now();
    let totals = LedgerTotals::from_items(&items);
    let id = EntityId::generate();
    Order {
        order_number: format!("ORD-TEST-{}", id.short_suffix(12)),
        id,
        company_id: company_id.clone(),
        retailer_id: retailer_id.clone(),
        created_by: retailer_id.clone(),
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::Credit,
        items,
        subtotal_paise: totals.subtotal.paise(),
        tax_amount_paise: totals.tax.paise(),
        total_amount_paise: totals.total().paise(),
        delivery_address: address(),
        delivery_notes: None,
        notes: None,
        status_notes: None,
        tracking_number: None,
        expected_delivery_date: Some(now + Duration::days(3)),
        delivery_date: None,
        cancellation_reason: None,
        cancelled_by: None,
        cancelled_at: None,
        invoice_generated: false,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory database with one manufacturer, its company, one retailer
/// and one stocked product.
pub(crate) struct Fixture {
    pub db: Database,
    pub owner: User,
    pub company: Company,
    pub retailer: User,
    pub product: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let owner = user("maker", Role::Manufacturer);
        db.users().insert(&owner, "hash").await.unwrap();

        let company = company(&owner.id, "Sharma Foods");
        db.companies().insert(&company).await.unwrap();

        let retailer = user("shopkeeper", Role::Retailer);
        db.users().insert(&retailer, "hash").await.unwrap();

        let product = product(&company.id, 50_000, 20);
        db.products().insert(&product).await.unwrap();

        Fixture {
            db,
            owner,
            company,
            retailer,
            product,
        }
    }

    pub async fn user(&self, username: &str, role: Role) -> User {
        let u = user(username, role);
        self.db.users().insert(&u, "hash").await.unwrap();
        u
    }

    pub async fn connect(&self, retailer_id: &EntityId) -> Connection {
        let conn = connection(&self.company, retailer_id);
        let mut tx = self.db.begin().await.unwrap();
        ConnectionRepository::insert(&mut tx, &conn).await.unwrap();
        tx.commit().await.unwrap();
        conn
    }

    /// Stores a pending order for `quantity` of the fixture product.
    /// Stock is not reserved.
    pub async fn place(&self, quantity: i64) -> Order {
        let item = LineItem::price(&self.product, quantity, None);
        let order = order(&self.company.id, &self.retailer.id, vec![item]);
        let mut tx = self.db.begin().await.unwrap();
        OrderRepository::insert(&mut tx, &order).await.unwrap();
        tx.commit().await.unwrap();
        order
    }
}
