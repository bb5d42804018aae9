use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ReconcileConfig;
use crate::extract::PriceResolver;
use crate::fields;
use crate::models::{MergeOutcome, ProductRecord};
use crate::snapshot::PageSnapshot;
use crate::ui::UiSink;

/// Where a re-resolution request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A click/change inside a variant or SKU picker. Immediate intent: the
    /// page is about to swap its price in.
    Interaction,
    /// A DOM subtree change under a price-bearing container or the body.
    Mutation,
    /// The exposed page-state price differs from the last seen value.
    StateChange,
    /// Low-frequency safety-net reparse.
    Tick,
}

/// Anything that can produce a page snapshot on demand: the live browser
/// session in production, a canned document in tests.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn snapshot(&self) -> crate::Result<PageSnapshot>;
}

/// Cloneable sender half; watchers and embedders push triggers through it.
#[derive(Debug, Clone)]
pub struct TriggerHandle {
    tx: mpsc::UnboundedSender<Trigger>,
}

impl TriggerHandle {
    pub fn notify(&self, trigger: Trigger) {
        // a closed channel just means the loop is gone; nothing to do
        let _ = self.tx.send(trigger);
    }

    pub fn notify_interaction(&self) {
        self.notify(Trigger::Interaction);
    }

    pub fn notify_mutation(&self) {
        self.notify(Trigger::Mutation);
    }

    pub fn notify_state_change(&self) {
        self.notify(Trigger::StateChange);
    }

    pub fn notify_tick(&self) {
        self.notify(Trigger::Tick);
    }
}

/// The live reconciliation loop. All trigger classes funnel into a single
/// debounced re-resolve; within a coalescing window only the last scheduled
/// run executes. The loop is the record's only writer.
pub struct ReconcileLoop {
    provider: Arc<dyn SnapshotProvider>,
    resolver: PriceResolver,
    sink: Arc<dyn UiSink>,
    config: ReconcileConfig,
    record: ProductRecord,
    rx: mpsc::UnboundedReceiver<Trigger>,
}

impl ReconcileLoop {
    pub fn new(
        provider: Arc<dyn SnapshotProvider>,
        resolver: PriceResolver,
        sink: Arc<dyn UiSink>,
        config: ReconcileConfig,
    ) -> (Self, TriggerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ReconcileLoop {
                provider,
                resolver,
                sink,
                config,
                record: ProductRecord::default(),
                rx,
            },
            TriggerHandle { tx },
        )
    }

    pub fn record(&self) -> &ProductRecord {
        &self.record
    }

    /// One full synchronous pass: snapshot, extract, merge, notify. A failed
    /// capture degrades to "nothing new"; the record keeps its last good
    /// values.
    pub async fn resolve_now(&mut self) -> MergeOutcome {
        let snapshot = match self.provider.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("snapshot failed, keeping previous record: {}", e);
                return MergeOutcome::default();
            }
        };

        let doc = snapshot.document();
        let extracted = fields::extract(&doc);
        drop(doc);

        let update = ProductRecord {
            title: extracted.title,
            price: self.resolver.resolve_formatted(&snapshot),
            description: extracted.description,
        };

        let outcome = self.record.merge(&update);
        if outcome.changed {
            self.sink.product_updated(&self.record, outcome.price_changed);
        }
        outcome
    }

    /// Run until every [`TriggerHandle`] is dropped, then hand back the
    /// final record. Triggers arriving while the window is open reset the
    /// deadline, so a burst collapses into one pass.
    pub async fn run(mut self) -> ProductRecord {
        info!("reconciliation loop started");

        let mut armed = false;
        let sleep = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                maybe = self.rx.recv() => match maybe {
                    Some(trigger) => {
                        let delay = self.delay_for(trigger);
                        debug!(?trigger, ?delay, "re-resolution scheduled");
                        sleep.as_mut().reset(Instant::now() + delay);
                        armed = true;
                    }
                    None => break,
                },
                () = sleep.as_mut(), if armed => {
                    armed = false;
                    self.resolve_now().await;
                }
            }
        }

        // drain the window left open by a final burst
        if armed {
            self.resolve_now().await;
        }

        info!("reconciliation loop stopped");
        self.record
    }

    fn delay_for(&self, trigger: Trigger) -> Duration {
        match trigger {
            // short fixed delay so the page's own async price update lands first
            Trigger::Interaction => Duration::from_millis(self.config.interaction_delay_ms),
            _ => Duration::from_millis(self.config.debounce_ms),
        }
    }
}
