//! Fire-and-forget event delivery over tokio channels.
//!
//! An [`EventHandler`] owns the receiving end of a bounded channel and a single async callback. Any number of
//! [`EventProducer`]s can publish into it. Handlers see only the event itself, never the checkout state, and a
//! handler failure can't reach the code that published the event.
//!
//! The handler loop exits once every producer has been dropped, after waiting for in-flight callbacks to finish.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Runs the handler until every producer has gone away.
    pub async fn start_handler(self) {
        let Self { mut receiver, sender, handler } = self;
        // Our own sender would otherwise keep the channel open forever
        drop(sender);
        debug!("📬️ Event handler started");
        let mut jobs = JoinSet::new();
        while let Some(event) = receiver.recv().await {
            let handler = Arc::clone(&handler);
            jobs.spawn(async move { (handler)(event).await });
            // Reap finished callbacks so the set doesn't grow without bound
            while let Some(done) = jobs.try_join_next() {
                if let Err(e) = done {
                    warn!("📬️ An event callback panicked. {e}");
                }
            }
        }
        trace!("📬️ All producers dropped. Waiting for {} callbacks.", jobs.len());
        while let Some(done) = jobs.join_next().await {
            if let Err(e) = done {
                warn!("📬️ An event callback panicked. {e}");
            }
        }
        debug!("📬️ Event handler stopped");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Could not publish event. The handler has stopped. {e}");
        }
    }
}
