use crate::activity::{ActivityKind, ActivityLogger};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use poise::serenity_prelude::{Context, FullEvent};
use serde_json::json;
use std::fmt::Debug;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::error;

#[async_trait]
pub trait EventHandler: Send + Sync + Debug {
    fn name(&self) -> &str;
    async fn handle(
        &self,
        ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn box_clone(&self) -> Box<dyn EventHandler>;
}

impl Clone for Box<dyn EventHandler> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Runs every registered handler for each gateway event, each on its own task.
#[derive(Debug)]
pub struct EventManager {
    handlers: Mutex<Vec<Box<dyn EventHandler>>>,
    activity: ActivityLogger,
}

impl EventManager {
    pub fn new(activity: ActivityLogger) -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            activity,
        }
    }

    pub async fn add_handler(&self, handler: impl EventHandler + 'static) {
        self.handlers.lock().await.push(Box::new(handler));
    }

    pub async fn handle_event(&self, ctx: &Context, event: &FullEvent) {
        let handlers: Vec<Box<dyn EventHandler>> = self.handlers.lock().await.clone();
        let mut running = Vec::with_capacity(handlers.len());

        for handler in handlers {
            let ctx = ctx.clone();
            let event = event.clone();
            let name = handler.name().to_string();

            let handle = tokio::spawn(async move {
                if let Err(e) = handler.handle(&ctx, &event).await {
                    error!("Error in event handler {}: {}", handler.name(), e);
                }
            });
            running.push((name, handle));
        }

        self.supervise(running).await;
    }

    /// Waits for every handler task, recording the ones that panicked.
    async fn supervise(&self, running: Vec<(String, JoinHandle<()>)>) {
        let mut futures: FuturesUnordered<_> = running
            .into_iter()
            .map(|(name, handle)| async move { (name, handle.await) })
            .collect();

        while let Some((name, result)) = futures.next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("Event handler {} panicked", name);
                    self.activity.log(
                        ActivityKind::UnhandledFailure,
                        json!({ "handler": name, "error": e.to_string() }),
                    );
                }
            }
        }
    }
}
