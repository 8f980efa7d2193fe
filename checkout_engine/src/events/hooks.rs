use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    OrderAuthorizedEvent,
    OrderCancelledEvent,
    OrderCapturedEvent,
    OrderRefundedEvent,
};

type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Generates the hook, handler and producer plumbing for each checkout event.
macro_rules! checkout_events {
    ($($event:ident => $hook:ident, $publish:ident);+ $(;)?) => {
        /// The callbacks to run for each event. Unset hooks cost nothing: no channel is created for them.
        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: Fn($event) -> BoxedFuture + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }

        pub struct EventHandlers {
            $($hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self { $($hook: hooks.$hook.map(|f| EventHandler::new(buffer_size, f)),)+ }
            }

            pub fn producers(&self) -> EventProducers {
                EventProducers { $($hook: self.$hook.as_ref().map(|h| h.subscribe()),)+ }
            }

            /// Spawns a task per configured handler. Each task ends when the last producer is dropped.
            pub fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        tokio::spawn(handler.start_handler());
                    }
                )+
            }
        }

        /// Cheap to clone. Publishing to an event nobody hooked is a no-op.
        #[derive(Default, Clone)]
        pub struct EventProducers {
            $($hook: Option<EventProducer<$event>>,)+
        }

        impl EventProducers {
            $(
                pub async fn $publish(&self, event: $event) {
                    if let Some(producer) = &self.$hook {
                        producer.publish_event(event).await;
                    }
                }
            )+
        }
    };
}

checkout_events! {
    OrderAuthorizedEvent => on_order_authorized, publish_order_authorized;
    OrderCapturedEvent => on_order_captured, publish_order_captured;
    OrderRefundedEvent => on_order_refunded, publish_order_refunded;
    OrderCancelledEvent => on_order_cancelled, publish_order_cancelled;
}
