//! Orders.

use tracing::{info, instrument};

use atelier_core::order::{NewOrder, Order};
use atelier_core::{OrderId, OrderStatus};

use crate::cache::Invalidation;
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::StatusUpdate;
use crate::transport::AccessToken;

impl ApiClient {
    /// Place an order.
    ///
    /// Purchased products change stock, so their cached copies are dropped.
    ///
    /// # Errors
    ///
    /// Returns the upstream error (e.g. a 400 when stock ran out meanwhile).
    #[instrument(skip(self, order, token), fields(items = order.items.len(), method = ?order.payment_method))]
    pub async fn create_order(&self, order: &NewOrder, token: &AccessToken) -> Result<Order, ApiError> {
        let created: Order = self.api().post("/orders", order, Some(token)).await?;
        for item in &order.items {
            self.invalidate(Invalidation::Product(item.product_id));
        }
        info!(order_id = %created.id, total = %created.total_price, "Order placed");
        Ok(created)
    }

    /// The signed-in user's orders.
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token))]
    pub async fn my_orders(&self, token: &AccessToken) -> Result<Vec<Order>, ApiError> {
        self.api().get("/orders/mine", Some(token)).await
    }

    /// A single order. The backend only returns other users' orders to admins.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] or [`ApiError::Forbidden`].
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn order(&self, id: OrderId, token: &AccessToken) -> Result<Order, ApiError> {
        self.api().get(&format!("/orders/{id}"), Some(token)).await
    }

    /// Every order, optionally filtered by status (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token))]
    pub async fn all_orders(
        &self,
        status: Option<OrderStatus>,
        token: &AccessToken,
    ) -> Result<Vec<Order>, ApiError> {
        match status {
            Some(status) => {
                self.api()
                    .get_with_query("/orders", &[("status", status)], Some(token))
                    .await
            }
            None => self.api().get("/orders", Some(token)).await,
        }
    }

    /// Move an order to a new status (admin).
    ///
    /// # Errors
    ///
    /// Returns the upstream error.
    #[instrument(skip(self, token), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        token: &AccessToken,
    ) -> Result<Order, ApiError> {
        self.api()
            .put(
                &format!("/orders/{id}/status"),
                &StatusUpdate { status },
                Some(token),
            )
            .await
    }
}
