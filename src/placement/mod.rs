//! Order placement
//!
//! Submits approved intents to the exchange and creates the local order
//! row. Capital was already locked by the risk gate, so every failure path
//! must either keep the lock (order is live) or release it (order never
//! happened). The client request id is deterministic per intent, so a
//! retry after an ambiguous network failure cannot create two live orders.

use crate::error::{EngineError, Result};
use crate::exchange::{ExchangeClient, ExchangeError, PlaceOrderArgs};
use crate::gate::OrderIntent;
use crate::ledger::CapitalLedger;
use crate::order::Order;
use crate::signal::Side;
use crate::store::OrderStore;
use crate::strategy::Strategy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// What happened to a submitted intent
#[derive(Debug, Clone)]
pub enum PlacementOutcome {
    /// Order is live on the exchange; capital stays locked
    Placed(Order),
    /// Exchange refused definitively; capital released, audit row written
    Rejected(Order),
}

/// Submits intents and persists the resulting order rows
#[derive(Clone)]
pub struct OrderPlacer {
    exchange: Arc<dyn ExchangeClient>,
    orders: Arc<dyn OrderStore>,
    ledger: CapitalLedger,
}

impl OrderPlacer {
    /// Create a placer over the given exchange and store
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        orders: Arc<dyn OrderStore>,
        ledger: CapitalLedger,
    ) -> Self {
        Self {
            exchange,
            orders,
            ledger,
        }
    }

    /// Submit one approved intent
    ///
    /// Transient exchange failures release the locked capital and return an
    /// error; the signal becomes eligible again on redelivery.
    pub async fn place(&self, strategy: &Strategy, intent: OrderIntent) -> Result<PlacementOutcome> {
        let limit_price = limit_price_for(intent.side, intent.price, strategy.slippage_tolerance);
        let shares = (intent.size_usd / limit_price).round_dp(2);

        let args = PlaceOrderArgs {
            token_id: intent.token_id.clone(),
            side: intent.side,
            price: limit_price,
            size: shares,
            time_in_force: intent.time_in_force,
            expiration: None,
            client_request_id: intent.client_request_id.clone(),
        };

        match self.exchange.place(&args).await {
            Ok(exchange_order_id) => {
                let order = Order::pending(&intent, limit_price, exchange_order_id);
                self.orders.insert(order.clone()).await?;

                tracing::info!(
                    order_id = %order.id,
                    strategy_id = %order.strategy_id,
                    token_id = %order.token_id,
                    limit_price = %limit_price,
                    size_usd = %order.signal_size_usd,
                    "Order placed"
                );
                crate::telemetry::record_order_placed();

                Ok(PlacementOutcome::Placed(order))
            }
            Err(ExchangeError::Rejected(reason)) => {
                self.ledger.unlock(intent.strategy_id, intent.size_usd).await?;

                let order = Order::rejected(&intent, limit_price, reason.clone());
                self.orders.insert(order.clone()).await?;

                tracing::warn!(
                    strategy_id = %intent.strategy_id,
                    source_trade_id = %intent.source_trade_id,
                    reason = %reason,
                    "Exchange rejected order, capital released"
                );

                Ok(PlacementOutcome::Rejected(order))
            }
            Err(ExchangeError::Transient(detail)) => {
                self.ledger.unlock(intent.strategy_id, intent.size_usd).await?;

                tracing::warn!(
                    strategy_id = %intent.strategy_id,
                    source_trade_id = %intent.source_trade_id,
                    error = %detail,
                    "Transient placement failure, capital released"
                );

                Err(EngineError::ExchangeTransient(detail))
            }
        }
    }
}

/// Limit price crossing the signal price by at most the slippage tolerance
pub(crate) fn limit_price_for(side: Side, signal_price: Decimal, tolerance: Decimal) -> Decimal {
    let crossed = match side {
        Side::Buy => signal_price * (dec!(1) + tolerance),
        Side::Sell => signal_price * (dec!(1) - tolerance),
    };
    crossed.round_dp(2).clamp(dec!(0.01), dec!(0.99))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{RemoteOrderState, TimeInForce};
    use crate::store::{MemoryStore, StrategyStore};
    use crate::strategy::SizingPolicy;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted exchange for unit tests
    struct ScriptedExchange {
        responses: Mutex<Vec<std::result::Result<String, ExchangeError>>>,
    }

    impl ScriptedExchange {
        fn new(responses: Vec<std::result::Result<String, ExchangeError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ExchangeClient for ScriptedExchange {
        async fn place(
            &self,
            _args: &PlaceOrderArgs,
        ) -> std::result::Result<String, ExchangeError> {
            self.responses.lock().unwrap().remove(0)
        }

        async fn cancel(&self, _id: &str) -> std::result::Result<(), ExchangeError> {
            Ok(())
        }

        async fn get_order(
            &self,
            _id: &str,
        ) -> std::result::Result<RemoteOrderState, ExchangeError> {
            Err(ExchangeError::Transient("not scripted".into()))
        }
    }

    async fn fixture(
        responses: Vec<std::result::Result<String, ExchangeError>>,
    ) -> (OrderPlacer, Arc<MemoryStore>, Strategy, OrderIntent) {
        let store = Arc::new(MemoryStore::new());
        let strategy = Strategy::new(
            "user-1",
            "0xwallet",
            "sim-1",
            dec!(1000),
            SizingPolicy::Fixed { amount: dec!(100) },
        );
        StrategyStore::insert(store.as_ref(), strategy.clone())
            .await
            .unwrap();
        let ledger = CapitalLedger::new(store.clone());
        // Capital the gate would have locked for this intent
        ledger.lock(strategy.id, dec!(100)).await.unwrap();
        let strategy = StrategyStore::get(store.as_ref(), strategy.id)
            .await
            .unwrap();

        let intent = OrderIntent {
            strategy_id: strategy.id,
            source_trade_id: "t1".to_string(),
            market_id: "0xcond".to_string(),
            token_id: "token".to_string(),
            side: Side::Buy,
            price: dec!(0.55),
            size_usd: dec!(100),
            time_in_force: TimeInForce::Gtc,
            client_request_id: "req-1".to_string(),
        };

        let exchange = Arc::new(ScriptedExchange::new(responses));
        let placer = OrderPlacer::new(exchange, store.clone(), ledger);
        (placer, store, strategy, intent)
    }

    #[tokio::test]
    async fn test_successful_placement_keeps_lock() {
        let (placer, store, strategy, intent) =
            fixture(vec![Ok("0xexchange".to_string())]).await;

        let outcome = placer.place(&strategy, intent).await.unwrap();
        let order = match outcome {
            PlacementOutcome::Placed(order) => order,
            other => panic!("expected placement, got {:?}", other),
        };
        assert_eq!(order.exchange_order_id.as_deref(), Some("0xexchange"));
        assert_eq!(order.status, crate::order::OrderStatus::Pending);
        // Buy at 0.55 with 2% tolerance -> limit 0.56
        assert_eq!(order.limit_price, dec!(0.56));

        let stored = StrategyStore::get(store.as_ref(), strategy.id)
            .await
            .unwrap();
        assert_eq!(stored.locked_capital, dec!(100));
        assert_eq!(stored.available_cash, dec!(900));

        let row = store.find_by_signal(strategy.id, "t1").await.unwrap();
        assert!(row.is_some());
    }

    #[tokio::test]
    async fn test_rejection_releases_capital_and_audits() {
        let (placer, store, strategy, intent) = fixture(vec![Err(
            ExchangeError::Rejected("price out of band".to_string()),
        )])
        .await;

        let outcome = placer.place(&strategy, intent).await.unwrap();
        let order = match outcome {
            PlacementOutcome::Rejected(order) => order,
            other => panic!("expected rejection, got {:?}", other),
        };
        assert_eq!(order.status, crate::order::OrderStatus::Rejected);
        assert_eq!(order.rejection_reason.as_deref(), Some("price out of band"));

        let stored = StrategyStore::get(store.as_ref(), strategy.id)
            .await
            .unwrap();
        assert_eq!(stored.locked_capital, dec!(0));
        assert_eq!(stored.available_cash, dec!(1000));

        // Audit row also marks the signal as processed
        let row = store.find_by_signal(strategy.id, "t1").await.unwrap();
        assert_eq!(row.unwrap().status, crate::order::OrderStatus::Rejected);
    }

    #[tokio::test]
    async fn test_transient_failure_releases_capital_no_row() {
        let (placer, store, strategy, intent) =
            fixture(vec![Err(ExchangeError::Transient("timeout".to_string()))]).await;

        let result = placer.place(&strategy, intent).await;
        assert!(matches!(result, Err(EngineError::ExchangeTransient(_))));

        let stored = StrategyStore::get(store.as_ref(), strategy.id)
            .await
            .unwrap();
        assert_eq!(stored.locked_capital, dec!(0));
        assert_eq!(stored.available_cash, dec!(1000));

        // No order row: the signal stays eligible for redelivery
        let row = store.find_by_signal(strategy.id, "t1").await.unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn test_limit_price_buy_crosses_up() {
        assert_eq!(limit_price_for(Side::Buy, dec!(0.50), dec!(0.02)), dec!(0.51));
    }

    #[test]
    fn test_limit_price_sell_crosses_down() {
        assert_eq!(limit_price_for(Side::Sell, dec!(0.50), dec!(0.02)), dec!(0.49));
    }

    #[test]
    fn test_limit_price_capped_inside_book() {
        assert_eq!(limit_price_for(Side::Buy, dec!(0.99), dec!(0.05)), dec!(0.99));
        assert_eq!(limit_price_for(Side::Sell, dec!(0.01), dec!(0.50)), dec!(0.01));
    }

    #[test]
    fn test_limit_price_zero_tolerance() {
        assert_eq!(limit_price_for(Side::Buy, dec!(0.55), dec!(0)), dec!(0.55));
    }
}
