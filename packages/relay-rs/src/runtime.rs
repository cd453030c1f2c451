//! Routing runtime: the one bus subscription that fans actions out to
//! triggers by tag.
//!
//! The runtime never waits on an invocation. Submitting to a runner only
//! enqueues or spawns, so a slow trigger cannot delay routing for others.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, info, trace};

use crate::bus::Subscription;
use crate::core::Action;
use crate::inflight::InflightTracker;
use crate::trigger::TriggerRunner;

/// Routes every bus action to the runners whose match set contains its tag.
pub(crate) struct Runtime<A: Action, D> {
    runners: Vec<TriggerRunner<A, D>>,
    routes: HashMap<A::Tag, SmallVec<[usize; 4]>>,
    inflight: Arc<InflightTracker>,
}

impl<A: Action, D: Send + Sync + 'static> Runtime<A, D> {
    pub(crate) fn new(runners: Vec<TriggerRunner<A, D>>, inflight: Arc<InflightTracker>) -> Self {
        let mut routes: HashMap<A::Tag, SmallVec<[usize; 4]>> = HashMap::new();
        for (index, runner) in runners.iter().enumerate() {
            for tag in runner.matches() {
                let slots = routes.entry(tag).or_default();
                if !slots.contains(&index) {
                    slots.push(index);
                }
            }
        }

        Self {
            runners,
            routes,
            inflight,
        }
    }

    /// Number of distinct tags with at least one trigger.
    pub(crate) fn routed_tags(&self) -> usize {
        self.routes.len()
    }

    /// Process actions until every bus handle is dropped.
    pub(crate) async fn run(self, mut subscription: Subscription<A>) {
        info!(
            triggers = self.runners.len(),
            tags = self.routed_tags(),
            "relay runtime started"
        );

        while let Some(envelope) = subscription.recv().await {
            let tag = envelope.tag();
            match self.routes.get(&tag) {
                Some(slots) => {
                    for &index in slots {
                        let runner = &self.runners[index];
                        debug!(
                            trigger = runner.name(),
                            tag = ?tag,
                            seq = envelope.seq,
                            cid = %envelope.cid,
                            "routing action"
                        );
                        runner.submit(&envelope);
                    }
                }
                None => trace!(tag = ?tag, seq = envelope.seq, "no trigger matches"),
            }

            // Every matching invocation is now counted on its own.
            self.inflight.dec(1);
        }

        info!("relay runtime stopped");
    }
}
