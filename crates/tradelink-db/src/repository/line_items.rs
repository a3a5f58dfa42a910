//! Line item storage shared by orders and invoices.
//!
//! Both documents snapshot identical [`LineItem`] rows; only the table and
//! the parent key differ. Items are kept in input order via `position`.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use tradelink_core::{EntityId, LineItem};

const ITEM_COLUMNS: &str = r#"
    product_id, product_name, hsn_code, unit, quantity,
    unit_price_paise, line_total_paise,
    cgst_rate_bps, sgst_rate_bps, igst_rate_bps, cess_rate_bps,
    cgst_amount_paise, sgst_amount_paise, igst_amount_paise, cess_amount_paise,
    tax_amount_paise, total_price_paise
"#;

/// Which document table a set of items belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ItemTable {
    Order,
    Invoice,
}

impl ItemTable {
    fn table(self) -> &'static str {
        match self {
            ItemTable::Order => "order_items",
            ItemTable::Invoice => "invoice_items",
        }
    }

    fn parent_column(self) -> &'static str {
        match self {
            ItemTable::Order => "order_id",
            ItemTable::Invoice => "invoice_id",
        }
    }
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    table: ItemTable,
    parent_id: &EntityId,
    items: &[LineItem],
) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO {} ({}, position, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        table.table(),
        table.parent_column(),
        ITEM_COLUMNS
    );

    for (position, item) in items.iter().enumerate() {
        sqlx::query(&sql)
            .bind(parent_id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(&item.hsn_code)
            .bind(&item.unit)
            .bind(item.quantity)
            .bind(item.unit_price_paise)
            .bind(item.line_total_paise)
            .bind(item.cgst_rate_bps)
            .bind(item.sgst_rate_bps)
            .bind(item.igst_rate_bps)
            .bind(item.cess_rate_bps)
            .bind(item.cgst_amount_paise)
            .bind(item.sgst_amount_paise)
            .bind(item.igst_amount_paise)
            .bind(item.cess_amount_paise)
            .bind(item.tax_amount_paise)
            .bind(item.total_price_paise)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub(crate) async fn fetch(
    pool: &SqlitePool,
    table: ItemTable,
    parent_id: &EntityId,
) -> DbResult<Vec<LineItem>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY position",
        ITEM_COLUMNS,
        table.table(),
        table.parent_column()
    );
    let items = sqlx::query_as::<_, LineItem>(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await?;

    Ok(items)
}
