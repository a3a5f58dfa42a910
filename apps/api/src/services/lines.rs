//! Line pricing and stock reservation shared by order placement and direct
//! invoicing, so both paths price and round identically.

use sqlx::SqliteConnection;

use crate::error::ServiceResult;
use tradelink_core::input::LineItemInput;
use tradelink_core::{CoreError, EntityId, LineItem};
use tradelink_db::{Database, DbError, ProductRepository};

/// Prices each requested line against the company's catalog.
///
/// Reads happen outside any transaction; stock is only checked for real by
/// [`reserve_lines`].
pub(crate) async fn price_lines(
    db: &Database,
    company_id: &EntityId,
    items: &[LineItemInput],
) -> ServiceResult<Vec<LineItem>> {
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let product = match db.products().get_by_id(&item.product_id).await {
            Ok(p) => p,
            Err(DbError::NotFound { .. }) => {
                return Err(CoreError::ProductUnavailable {
                    product_id: item.product_id.to_string(),
                }
                .into())
            }
            Err(e) => return Err(e.into()),
        };

        if !product.is_sellable_by(company_id) {
            return Err(CoreError::ProductUnavailable {
                product_id: item.product_id.to_string(),
            }
            .into());
        }

        lines.push(LineItem::price(&product, item.quantity, item.unit_price_paise));
    }

    Ok(lines)
}

/// Conditionally decrements stock for every line, in order.
///
/// The first short line aborts with `InsufficientStock`; the caller drops
/// the transaction, which puts back whatever earlier lines reserved.
pub(crate) async fn reserve_lines(
    conn: &mut SqliteConnection,
    lines: &[LineItem],
) -> ServiceResult<()> {
    for line in lines {
        if !ProductRepository::reserve_stock(conn, &line.product_id, line.quantity).await? {
            let available = ProductRepository::available_quantity(conn, &line.product_id).await?;
            return Err(CoreError::InsufficientStock {
                product: line.product_name.clone(),
                available,
                requested: line.quantity,
            }
            .into());
        }
    }
    Ok(())
}
