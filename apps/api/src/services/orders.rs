//! # Commerce Ledger: Orders
//!
//! ```text
//! PlaceOrder ─┬─ connection approved?      (else NotConnected)
//!             ├─ price lines               (catalog or negotiated price)
//!             └─ BEGIN
//!                  reserve stock per line  (conditional decrement)
//!                  number = ORD-{millis}-{count+1}
//!                  insert order + items
//!                  bump connection counters
//!                COMMIT
//!
//! CancelOrder ── BEGIN  cancel-if-cancellable, restore stock  COMMIT
//! ```
//!
//! Stock is never read-then-written: every reservation is a conditional
//! update, and a short line drops the transaction so earlier lines of the
//! same order are put back.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use super::lines::{price_lines, reserve_lines};
use crate::error::{ServiceError, ServiceResult};
use tradelink_core::input::{CancelOrderInput, PlaceOrderInput, UpdateOrderStatusInput};
use tradelink_core::order::order_number;
use tradelink_core::{
    Actor, CoreError, EntityId, LedgerTotals, Order, OrderStatus, Role, ValidationError,
    DEFAULT_CANCELLATION_REASON,
};
use tradelink_db::{
    ConnectionRepository, Database, DbError, OrderRepository, ProductRepository,
};

/// Attempts at allocating an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderFilter {
    /// Company to list for; defaults to the caller's own company.
    #[serde(default)]
    pub company_id: Option<EntityId>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// Places an order on an approved connection, reserving stock atomically.
    ///
    /// A retailer orders for itself. A company operator may place the order
    /// on behalf of a connected retailer by naming `retailer_id`.
    pub async fn place_order(&self, actor: &Actor, input: PlaceOrderInput) -> ServiceResult<Order> {
        let input = input.validate()?;
        let company_id = input.company_id.clone();

        let retailer_id = if actor.role == Role::Retailer {
            if let Some(requested) = &input.retailer_id {
                if !actor.is(requested) {
                    return Err(CoreError::forbidden("retailers can only order for themselves").into());
                }
            }
            actor.user_id.clone()
        } else {
            actor.require_operator(&company_id)?;
            input.retailer_id.clone().ok_or_else(|| ValidationError::Required {
                field: "retailer_id".to_string(),
            })?
        };

        let connection = self
            .db
            .connections()
            .find_by_pair(&company_id, &retailer_id)
            .await?
            .filter(|c| c.permits_orders())
            .ok_or(CoreError::NotConnected)?;

        let items = price_lines(&self.db, &company_id, &input.items).await?;
        let totals = LedgerTotals::from_items(&items);

        for attempt in 1..=ORDER_NUMBER_ATTEMPTS {
            let mut tx = self.db.begin().await?;
            reserve_lines(&mut tx, &items).await?;

            let now = Utc::now();
            let seq = OrderRepository::count_by_company(&mut tx, &company_id).await? + 1;
            let order = Order {
                id: EntityId::generate(),
                order_number: order_number(now, seq),
                company_id: company_id.clone(),
                retailer_id: retailer_id.clone(),
                created_by: actor.user_id.clone(),
                status: OrderStatus::Pending,
                payment_method: input.payment_method,
                items: items.clone(),
                subtotal_paise: totals.subtotal.paise(),
                tax_amount_paise: totals.tax.paise(),
                total_amount_paise: totals.total().paise(),
                delivery_address: input.delivery_address.clone(),
                delivery_notes: input.delivery_notes.clone(),
                notes: input.notes.clone(),
                status_notes: None,
                tracking_number: None,
                expected_delivery_date: input.expected_delivery_date,
                delivery_date: None,
                cancellation_reason: None,
                cancelled_by: None,
                cancelled_at: None,
                invoice_generated: false,
                created_at: now,
                updated_at: now,
            };

            match OrderRepository::insert(&mut tx, &order).await {
                Ok(()) => {}
                Err(e) if e.is_unique_violation_on("orders.order_number") => {
                    warn!(attempt, number = %order.order_number, "Order number taken, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            ConnectionRepository::record_order(&mut tx, &connection.id, order.total_amount_paise, now)
                .await?;
            tx.commit().await.map_err(DbError::from)?;

            info!(
                order_id = %order.id,
                number = %order.order_number,
                company_id = %order.company_id,
                retailer_id = %order.retailer_id,
                total = %order.total(),
                "Order placed"
            );
            return Ok(order);
        }

        Err(ServiceError::Internal(
            "could not allocate a unique order number".to_string(),
        ))
    }

    /// Cancels a pending, confirmed or processing order and restores its stock.
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: &EntityId,
        input: CancelOrderInput,
    ) -> ServiceResult<Order> {
        let input = input.validate()?;
        let order = self.db.orders().get_by_id(order_id).await?;
        order.check_cancel(actor)?;

        let reason = input
            .reason
            .unwrap_or_else(|| DEFAULT_CANCELLATION_REASON.to_string());

        let mut tx = self.db.begin().await?;
        if !OrderRepository::cancel(&mut tx, order_id, &actor.user_id, &reason, Utc::now()).await? {
            drop(tx);
            let current = self.db.orders().get_by_id(order_id).await?;
            return Err(
                CoreError::invalid_state("Order", &current.order_number, current.status).into(),
            );
        }
        for item in &order.items {
            ProductRepository::restore_stock(&mut tx, &item.product_id, item.quantity).await?;
        }
        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order_id,
            number = %order.order_number,
            cancelled_by = %actor.user_id,
            "Order cancelled, stock restored"
        );
        Ok(self.db.orders().get_by_id(order_id).await?)
    }

    /// Moves an order along its lifecycle. Company operators only.
    ///
    /// Any non-terminal order may move to any status; `cancelled` goes
    /// through [`cancel_order`](Self::cancel_order) so stock is restored.
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: &EntityId,
        input: UpdateOrderStatusInput,
    ) -> ServiceResult<Order> {
        let input = input.validate()?;
        let order = self.db.orders().get_by_id(order_id).await?;
        actor.require_operator(&order.company_id)?;

        if input.status == OrderStatus::Cancelled {
            return self
                .cancel_order(actor, order_id, CancelOrderInput { reason: input.notes })
                .await;
        }

        order.check_advance()?;
        let updated = self
            .db
            .orders()
            .update_status(
                order_id,
                input.status,
                input.notes.as_deref(),
                input.tracking_number.as_deref(),
                Utc::now(),
            )
            .await?;
        if !updated {
            let current = self.db.orders().get_by_id(order_id).await?;
            return Err(
                CoreError::invalid_state("Order", &current.order_number, current.status).into(),
            );
        }

        info!(
            order_id = %order_id,
            from = %order.status,
            to = %input.status,
            "Order status updated"
        );
        Ok(self.db.orders().get_by_id(order_id).await?)
    }

    pub async fn get_order(&self, actor: &Actor, order_id: &EntityId) -> ServiceResult<Order> {
        let order = self.db.orders().get_by_id(order_id).await?;
        if !order.is_visible_to(actor) {
            return Err(CoreError::forbidden("you cannot view this order").into());
        }
        Ok(order)
    }

    /// Company-side listing for operators, otherwise the caller's own orders.
    pub async fn list_orders(&self, actor: &Actor, filter: OrderFilter) -> ServiceResult<Vec<Order>> {
        let company_id = filter
            .company_id
            .or_else(|| actor.memberships.first().map(|m| m.company_id.clone()));

        match company_id {
            Some(company_id) if actor.role != Role::Retailer => {
                actor.require_operator(&company_id)?;
                Ok(self
                    .db
                    .orders()
                    .list_by_company(&company_id, filter.status)
                    .await?)
            }
            _ => Ok(self
                .db
                .orders()
                .list_by_retailer(&actor.user_id, filter.status)
                .await?),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{core_err, Harness};
    use tradelink_core::MAX_AMOUNT_PAISE;

    #[tokio::test]
    async fn test_place_order_prices_reserves_and_counts() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let product = h.product_priced(10_000, 50, 900, 900).await;

        let order = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&product.id, 2))
            .await
            .unwrap();

        assert_eq!(order.subtotal_paise, 20_000);
        assert_eq!(order.tax_amount_paise, 3_600);
        assert_eq!(order.total_amount_paise, 23_600);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.order_number.starts_with("ORD-"));
        assert!(order.order_number.ends_with("-0001"));
        assert_eq!(h.stock(&product.id).await, 48);

        let connection = h
            .state
            .db
            .connections()
            .find_by_pair(&h.company.id, &retailer.user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connection.total_orders, 1);
        assert_eq!(connection.total_order_value_paise, 23_600);
        assert!(connection.last_order_date.is_some());
    }

    #[tokio::test]
    async fn test_unconnected_or_suspended_cannot_order() {
        let h = Harness::new().await;
        let stranger = h.retailer("stranger").await;

        let err = h
            .state
            .orders
            .place_order(&stranger, h.order_input(&h.product.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::NotConnected));

        let retailer = h.connected_retailer("kirana").await;
        h.suspend(&retailer).await;
        let err = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&h.product.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::NotConnected));
        assert_eq!(h.stock(&h.product.id).await, 20);
    }

    #[tokio::test]
    async fn test_foreign_product_is_unavailable() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let foreign = h.foreign_product().await;

        let err = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&foreign, 1))
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::ProductUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_short_line_rolls_back_whole_order() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let plenty = h.product_priced(10_000, 50, 900, 900).await;

        let mut input = h.order_input(&plenty.id, 5);
        input.items.push(tradelink_core::input::LineItemInput {
            product_id: h.product.id.clone(),
            quantity: 21,
            unit_price_paise: None,
        });

        let err = h.state.orders.place_order(&retailer, input).await.unwrap_err();
        match core_err(err) {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 20);
                assert_eq!(requested, 21);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(h.stock(&plenty.id).await, 50);
        assert_eq!(h.stock(&h.product.id).await, 20);
        assert!(h
            .state
            .orders
            .list_orders(&retailer, OrderFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    /// Concurrent orders never drive stock negative; the overflow fails
    /// with `InsufficientStock`.
    /// Eight retailers race for one unit each against a stock of five.
    async fn assert_orders_never_oversell(h: Harness) {
        let product = h.product_priced(10_000, 5, 900, 900).await;

        let mut tasks = Vec::new();
        for i in 0..8 {
            let retailer = h.connected_retailer(&format!("shop{i}")).await;
            let state = h.state.clone();
            let input = h.order_input(&product.id, 1);
            tasks.push(tokio::spawn(async move {
                state.orders.place_order(&retailer, input).await
            }));
        }

        let mut placed = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => placed += 1,
                Err(err) => assert!(matches!(
                    core_err(err),
                    CoreError::InsufficientStock { available: 0, requested: 1, .. }
                )),
            }
        }
        assert_eq!(placed, 5);
        assert_eq!(h.stock(&product.id).await, 0);

        let numbers: std::collections::HashSet<_> = h
            .state
            .orders
            .list_orders(&h.owner, OrderFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_number)
            .collect();
        assert_eq!(numbers.len(), 5);
    }

    #[tokio::test]
    async fn test_concurrent_orders_never_oversell() {
        assert_orders_never_oversell(Harness::new().await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_never_oversell_on_pooled_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_orders_never_oversell(Harness::on_file(&dir).await).await;
    }

    #[tokio::test]
    async fn test_operator_places_on_behalf_of_retailer() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;

        let mut input = h.order_input(&h.product.id, 1);
        let err = h
            .state
            .orders
            .place_order(&h.owner, input.clone())
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::Validation(_)));

        input.retailer_id = Some(retailer.user_id.clone());
        let order = h.state.orders.place_order(&h.owner, input).await.unwrap();
        assert_eq!(order.retailer_id, retailer.user_id);
        assert_eq!(order.created_by, h.owner.user_id);
    }

    #[tokio::test]
    async fn test_oversized_unit_price_is_rejected() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;

        let mut input = h.order_input(&h.product.id, 2);
        input.items[0].unit_price_paise = Some(i64::MAX / 2 + 1);
        let err = h.state.orders.place_order(&retailer, input).await.unwrap_err();
        assert!(matches!(
            core_err(err),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(h.stock(&h.product.id).await, 20);

        let mut input = h.order_input(&h.product.id, 2);
        input.items[0].unit_price_paise = Some(MAX_AMOUNT_PAISE);
        let order = h.state.orders.place_order(&retailer, input).await.unwrap();
        assert_eq!(order.subtotal_paise, MAX_AMOUNT_PAISE * 2);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let order = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&h.product.id, 3))
            .await
            .unwrap();
        assert_eq!(h.stock(&h.product.id).await, 17);

        let cancelled = h
            .state
            .orders
            .cancel_order(&retailer, &order.id, CancelOrderInput::default())
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some(DEFAULT_CANCELLATION_REASON)
        );
        assert_eq!(cancelled.cancelled_by, Some(retailer.user_id.clone()));
        assert_eq!(h.stock(&h.product.id).await, 20);

        let err = h
            .state
            .orders
            .cancel_order(&retailer, &order.id, CancelOrderInput::default())
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::InvalidState { .. }));
        assert_eq!(h.stock(&h.product.id).await, 20);
    }

    #[tokio::test]
    async fn test_shipped_order_cannot_be_cancelled() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let order = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&h.product.id, 3))
            .await
            .unwrap();

        let shipped = h
            .state
            .orders
            .update_status(
                &h.owner,
                &order.id,
                UpdateOrderStatusInput {
                    status: OrderStatus::Shipped,
                    notes: None,
                    tracking_number: Some("DTDC-7781".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(shipped.tracking_number.as_deref(), Some("DTDC-7781"));

        let err = h
            .state
            .orders
            .cancel_order(&retailer, &order.id, CancelOrderInput::default())
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::InvalidState { .. }));
        assert_eq!(h.stock(&h.product.id).await, 17);
    }

    #[tokio::test]
    async fn test_status_updates() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let order = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&h.product.id, 2))
            .await
            .unwrap();

        let to = |status| UpdateOrderStatusInput {
            status,
            notes: None,
            tracking_number: None,
        };

        let err = h
            .state
            .orders
            .update_status(&retailer, &order.id, to(OrderStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::Forbidden(_)));

        let delivered = h
            .state
            .orders
            .update_status(&h.owner, &order.id, to(OrderStatus::Delivered))
            .await
            .unwrap();
        assert!(delivered.delivery_date.is_some());

        let err = h
            .state
            .orders
            .update_status(&h.owner, &order.id, to(OrderStatus::Processing))
            .await
            .unwrap_err();
        assert!(matches!(core_err(err), CoreError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_cancel_through_status_update_restores_stock() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let order = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&h.product.id, 4))
            .await
            .unwrap();

        let cancelled = h
            .state
            .orders
            .update_status(
                &h.owner,
                &order.id,
                UpdateOrderStatusInput {
                    status: OrderStatus::Cancelled,
                    notes: Some("Retailer closed for Diwali".to_string()),
                    tracking_number: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("Retailer closed for Diwali")
        );
        assert_eq!(h.stock(&h.product.id).await, 20);
    }

    #[tokio::test]
    async fn test_visibility() {
        let h = Harness::new().await;
        let retailer = h.connected_retailer("kirana").await;
        let other = h.connected_retailer("other").await;
        let order = h
            .state
            .orders
            .place_order(&retailer, h.order_input(&h.product.id, 1))
            .await
            .unwrap();

        assert!(h.state.orders.get_order(&h.owner, &order.id).await.is_ok());
        assert!(h.state.orders.get_order(&retailer, &order.id).await.is_ok());
        let err = h.state.orders.get_order(&other, &order.id).await.unwrap_err();
        assert!(matches!(core_err(err), CoreError::Forbidden(_)));

        assert!(h
            .state
            .orders
            .list_orders(&other, OrderFilter::default())
            .await
            .unwrap()
            .is_empty());
    }
}
