//! Sales counters fed by checkout events.
//!
//! These stand in for the sharded analytics counters of a full deployment. Increments never fail and never hold up
//! the checkout that triggered them.
use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc,
    },
};

use checkout_engine::events::EventHooks;
use log::*;

#[derive(Debug, Default)]
pub struct SalesCounters {
    authorized: AtomicU64,
    captured: AtomicU64,
    captured_cents: AtomicI64,
    refunded_cents: AtomicI64,
    cancelled: AtomicU64,
}

impl SalesCounters {
    pub fn authorized(&self) -> u64 {
        self.authorized.load(Ordering::Relaxed)
    }

    pub fn captured(&self) -> u64 {
        self.captured.load(Ordering::Relaxed)
    }

    pub fn captured_cents(&self) -> i64 {
        self.captured_cents.load(Ordering::Relaxed)
    }

    pub fn refunded_cents(&self) -> i64 {
        self.refunded_cents.load(Ordering::Relaxed)
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Event hooks that log each event and bump the counters. Test orders are logged but not counted.
    pub fn hooks(self: &Arc<Self>) -> EventHooks {
        let mut hooks = EventHooks::default();
        let counters = Arc::clone(self);
        hooks.on_order_authorized(move |ev| {
            info!("📬️ Order {} authorized for {} {}", ev.order.id, ev.order.total, ev.order.currency);
            if !ev.order.test {
                counters.authorized.fetch_add(1, Ordering::Relaxed);
            }
            Box::pin(async {})
        });
        let counters = Arc::clone(self);
        hooks.on_order_captured(move |ev| {
            info!("📬️ Order {} captured {}", ev.order.id, ev.captured);
            if !ev.order.test {
                counters.captured.fetch_add(1, Ordering::Relaxed);
                counters.captured_cents.fetch_add(ev.captured.value(), Ordering::Relaxed);
            }
            Box::pin(async {})
        });
        let counters = Arc::clone(self);
        hooks.on_order_refunded(move |ev| {
            info!("📬️ Order {} refunded {}", ev.order.id, ev.amount);
            if !ev.order.test {
                counters.refunded_cents.fetch_add(ev.amount.value(), Ordering::Relaxed);
            }
            Box::pin(async {})
        });
        let counters = Arc::clone(self);
        hooks.on_order_cancelled(move |ev| {
            info!("📬️ Order {} cancelled", ev.order.id);
            if !ev.order.test {
                counters.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Box::pin(async {})
        });
        hooks
    }
}

impl Display for SalesCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} authorized, {} captured ({}c), {}c refunded, {} cancelled",
            self.authorized(),
            self.captured(),
            self.captured_cents(),
            self.refunded_cents(),
            self.cancelled()
        )
    }
}

#[cfg(test)]
mod test {
    use checkout_common::Cents;
    use checkout_engine::{
        db_types::Order,
        events::{EventHandlers, OrderCapturedEvent, OrderRefundedEvent},
    };

    use super::*;

    #[tokio::test]
    async fn live_orders_are_counted() {
        let counters = Arc::new(SalesCounters::default());
        let handlers = EventHandlers::new(5, counters.hooks());
        let producers = handlers.producers();
        handlers.start_handlers();
        let live = Order { id: "ord_1".into(), ..Default::default() };
        let test = Order { id: "ord_2".into(), test: true, ..Default::default() };
        producers.publish_order_captured(OrderCapturedEvent::new(live.clone(), vec![], Cents::from(2_500))).await;
        producers.publish_order_captured(OrderCapturedEvent::new(test, vec![], Cents::from(50))).await;
        producers.publish_order_refunded(OrderRefundedEvent::new(live, Cents::from(1_000))).await;
        drop(producers);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(counters.captured(), 1);
        assert_eq!(counters.captured_cents(), 2_500);
        assert_eq!(counters.refunded_cents(), 1_000);
        assert_eq!(counters.cancelled(), 0);
    }
}
