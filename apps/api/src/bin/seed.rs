//! # Seed Data Generator
//!
//! Populates the database with a small demo network for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./data/tradelink.db
//! cargo run -p tradelink-api --bin seed
//!
//! # Specify database path
//! cargo run -p tradelink-api --bin seed -- --db ./data/demo.db
//! ```
//!
//! ## Generated Network
//! - Manufacturer `sharmafoods` owning the public company "Sharma Foods"
//! - Employee `ravidriver` working for it
//! - Catalog: rice, pulses and spices with GST rates
//! - Retailer `ashastores`, connected through an invite code, with one
//!   invoiced and partly paid order
//! - Retailer `patelmart`, connected through an approved request
//!
//! Every account uses the password `password123`.

use std::env;

use anyhow::Context;

use tradelink_api::services::IdentityService;
use tradelink_api::{ApiConfig, AppState};
use tradelink_core::input::{
    AddEmployeeInput, CreateCategoryInput, CreateCompanyInput, CreateProductInput,
    GenerateInviteInput, InvoiceFromOrderInput, LineItemInput, PlaceOrderInput,
    RecordPaymentInput, RedeemInviteInput, RegisterInput, RequestApprovalInput,
    ResolveRequestInput,
};
use tradelink_core::{Actor, DeliveryAddress, PaymentMethod, PaymentMode, RequestAction, Role};
use tradelink_db::{Database, DbConfig};

const PASSWORD: &str = "password123";

/// (category, name, unit, price in paise, stock, gst bps split as cgst/sgst)
const CATALOG: &[(&str, &str, &str, i64, i64, u32)] = &[
    ("Rice", "Basmati Rice 25kg", "KG", 245_000, 120, 250),
    ("Rice", "Sona Masoori 25kg", "KG", 162_500, 200, 250),
    ("Pulses", "Toor Dal 1kg", "PACK", 14_800, 400, 250),
    ("Pulses", "Moong Dal 1kg", "PACK", 13_200, 350, 250),
    ("Spices", "Turmeric Powder 500g", "PACK", 9_500, 80, 250),
    ("Spices", "Garam Masala 100g", "PACK", 7_800, 8, 900),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./data/tradelink.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tradelink Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./data/tradelink.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tradelink Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().find_credentials("sharmafoods").await?.is_some() {
        println!("⚠ Demo accounts already exist");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let config = ApiConfig::load().context("Invalid configuration")?;
    let state = AppState::new(config, db);

    // Accounts
    let owner = register(&state.identity, "sharmafoods", Role::Manufacturer).await?;
    let driver = register(&state.identity, "ravidriver", Role::Employee).await?;
    let asha = register(&state.identity, "ashastores", Role::Retailer).await?;
    let patel = register(&state.identity, "patelmart", Role::Retailer).await?;
    println!("✓ Registered 4 accounts");

    // Company, refreshed so the owner's membership is loaded
    let company = state
        .directory
        .create_company(
            &owner.actor,
            CreateCompanyInput {
                name: "Sharma Foods".to_string(),
                description: Some("Staples distributor, Pune".to_string()),
                is_public: true,
            },
        )
        .await?;
    let owner = state.identity.authenticate(&owner.token).await?;
    state
        .directory
        .add_employee(
            &owner,
            &company.id,
            AddEmployeeInput {
                user_id: driver.actor.user_id.clone(),
            },
        )
        .await?;
    println!("✓ Created company {} ({})", company.name, company.id);

    // Catalog
    let mut products = Vec::new();
    for (category_name, name, unit, price, stock, gst_half) in CATALOG {
        let categories = state.directory.list_categories(&company.id).await?;
        let category = match categories.into_iter().find(|c| c.name == *category_name) {
            Some(category) => category,
            None => {
                state
                    .directory
                    .create_category(
                        &owner,
                        &company.id,
                        CreateCategoryInput {
                            name: category_name.to_string(),
                            description: None,
                        },
                    )
                    .await?
            }
        };

        let product = state
            .directory
            .create_product(
                &owner,
                &company.id,
                CreateProductInput {
                    name: name.to_string(),
                    description: None,
                    category_id: Some(category.id),
                    sku: None,
                    hsn_code: None,
                    unit: unit.to_string(),
                    price_paise: *price,
                    available_quantity: *stock,
                    reorder_level: None,
                    cgst_rate_bps: *gst_half,
                    sgst_rate_bps: *gst_half,
                    igst_rate_bps: 0,
                    cess_rate_bps: 0,
                },
            )
            .await?;
        products.push(product);
    }
    println!("✓ Created {} products", products.len());

    // Connection through an invite
    let invite = state
        .connections
        .generate_invite(&owner, &company.id, GenerateInviteInput::default())
        .await?;
    state
        .connections
        .redeem_invite(
            &asha.actor,
            RedeemInviteInput {
                invite_code: invite.invite.code.clone(),
            },
        )
        .await?;
    println!("✓ ashastores joined with invite {}", invite.invite.code);

    // Connection through a request
    let outcome = state
        .connections
        .request_approval(
            &patel.actor,
            RequestApprovalInput {
                company_id: company.id.clone(),
                message: "Patel Mart, two outlets in Kothrud. Keen to stock your pulses."
                    .to_string(),
            },
        )
        .await?;
    state
        .connections
        .resolve_request(
            &owner,
            &outcome.request.id,
            ResolveRequestInput {
                action: RequestAction::Approve,
                credit_limit_paise: Some(5_000_000),
                payment_terms: None,
            },
        )
        .await?;
    println!("✓ patelmart approved by request");

    // One order, invoiced and partly paid
    let order = state
        .orders
        .place_order(
            &asha.actor,
            PlaceOrderInput {
                company_id: company.id.clone(),
                retailer_id: None,
                items: products
                    .iter()
                    .take(3)
                    .map(|p| LineItemInput {
                        product_id: p.id.clone(),
                        quantity: 4,
                        unit_price_paise: None,
                    })
                    .collect(),
                delivery_address: DeliveryAddress {
                    address_line1: "14 Laxmi Road".to_string(),
                    address_line2: Some("Near Tulshibaug".to_string()),
                    city: "Pune".to_string(),
                    state: "Maharashtra".to_string(),
                    pincode: "411030".to_string(),
                    country: "India".to_string(),
                },
                payment_method: PaymentMethod::Credit,
                delivery_notes: None,
                notes: None,
                expected_delivery_date: None,
            },
        )
        .await?;
    let invoice = state
        .invoices
        .create_from_order(
            &owner,
            InvoiceFromOrderInput {
                order_id: order.id.clone(),
                due_date: None,
                payment_terms: None,
                notes: None,
            },
        )
        .await?;
    state
        .invoices
        .record_payment(
            &owner,
            &invoice.id,
            RecordPaymentInput {
                paid_amount_paise: invoice.grand_total_paise / 2,
                payment_mode: Some(PaymentMode::Upi),
                payment_date: None,
                notes: None,
            },
        )
        .await?;
    println!(
        "✓ Order {} invoiced as {} ({})",
        order.order_number,
        invoice.invoice_number,
        invoice.grand_total()
    );

    println!();
    println!("Accounts (password: {}):", PASSWORD);
    println!("  sharmafoods  manufacturer");
    println!("  ravidriver   employee");
    println!("  ashastores   retailer");
    println!("  patelmart    retailer");
    println!();
    println!("🎉 Seed complete!");

    Ok(())
}

struct Seeded {
    actor: Actor,
    token: String,
}

async fn register(identity: &IdentityService, username: &str, role: Role) -> anyhow::Result<Seeded> {
    let response = identity
        .register(RegisterInput {
            username: username.to_string(),
            email: format!("{}@tradelink.test", username),
            password: PASSWORD.to_string(),
            role,
            first_name: None,
            last_name: None,
        })
        .await
        .with_context(|| format!("Failed to register {}", username))?;

    let actor = identity.authenticate(&response.access_token).await?;
    Ok(Seeded {
        actor,
        token: response.access_token,
    })
}
