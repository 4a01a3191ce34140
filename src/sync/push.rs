//! Event-driven sync fast path
//!
//! Subscribes to the exchange user channel and funnels order events into
//! the same `sync_order` call the interval poller uses. The event payload
//! itself is only a trigger naming the order; exchange truth is still
//! fetched fresh, so the push path cannot diverge from polling.

use super::FillSynchronizer;
use crate::config::PushConfig;
use crate::store::OrderStore;
use crate::ws::{WsClient, WsConfig, WsMessage};
use serde::Deserialize;
use std::sync::Arc;

/// An order event from the user channel
#[derive(Debug, Deserialize)]
struct UserOrderEvent {
    event_type: String,
    /// Exchange order id the event refers to
    id: String,
}

/// Listens for order events and triggers targeted syncs
pub struct OrderEventListener {
    config: PushConfig,
    api_key: Option<String>,
    sync: FillSynchronizer,
    orders: Arc<dyn OrderStore>,
}

impl OrderEventListener {
    /// Create a listener over the given synchronizer
    pub fn new(
        config: PushConfig,
        api_key: Option<String>,
        sync: FillSynchronizer,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            config,
            api_key,
            sync,
            orders,
        }
    }

    /// Run the listener until the process shuts down
    pub async fn run(&self) {
        let ws = WsClient::new(WsConfig::new(&self.config.ws_url));
        let (mut rx, tx) = ws.connect();

        while let Some(message) = rx.recv().await {
            match message {
                WsMessage::Connected => {
                    let subscription = serde_json::json!({
                        "type": "user",
                        "auth": self.api_key,
                    });
                    if tx.send(subscription.to_string()).await.is_err() {
                        tracing::error!("Failed to send user-channel subscription");
                        break;
                    }
                    tracing::info!("Subscribed to user order events");
                }
                WsMessage::Text(text) => {
                    self.handle_text(&text).await;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::debug!(attempt, "User channel reconnecting");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("User channel disconnected");
                    break;
                }
            }
        }
    }

    /// Parse one frame and sync the order it names
    async fn handle_text(&self, text: &str) {
        let event: UserOrderEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(_) => return, // other channel traffic
        };
        if event.event_type != "order" {
            return;
        }
        self.handle_order_event(&event.id).await;
    }

    /// Sync the local order behind an exchange order id, if we track it
    pub async fn handle_order_event(&self, exchange_order_id: &str) {
        let order = match self.orders.find_by_exchange_id(exchange_order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::debug!(
                    exchange_order_id,
                    "Order event for an order we do not track"
                );
                return;
            }
            Err(e) => {
                tracing::warn!(exchange_order_id, error = %e, "Order lookup failed");
                return;
            }
        };

        match self.sync.sync_order(order.id).await {
            Ok(outcome) => {
                tracing::debug!(order_id = %order.id, outcome = ?outcome, "Push-triggered sync");
            }
            Err(e) => {
                // The poller picks this order up again next cycle
                tracing::warn!(order_id = %order.id, error = %e, "Push-triggered sync failed");
            }
        }
    }
}
