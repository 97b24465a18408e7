//! Inbound event loop
//!
//! One consumer reads the ordered inbound stream and forwards every event to a
//! lane: a task owning the events of a single chat identity. Lanes run the
//! dialogue engine, so a slow domain store write stalls only the user who
//! caused it. Within a lane events are handled strictly in arrival order.
//!
//! A lane that sees no traffic for `lane_idle_timeout_secs` closes its queue,
//! finishes whatever was already buffered and exits. The loop joins a retired
//! lane before starting its replacement, so ordering holds across restarts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::Notifier;
use crate::events::{DispatchDomainEvent, DomainEvent};
use crate::handlers::DialogueEngine;
use crate::repository::DomainStore;
use crate::settings::RuntimeConfig;
use crate::value_objects::{ChatId, InboundEvent};

/// Totals reported when the inbound stream ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub events_received: usize,
    pub events_handled: usize,
    pub domain_events: usize,
    pub lanes_spawned: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct LaneReport {
    handled: usize,
    domain_events: usize,
}

impl LoopReport {
    fn absorb(&mut self, lane: LaneReport) {
        self.events_handled += lane.handled;
        self.domain_events += lane.domain_events;
    }
}

struct Lane {
    sender: mpsc::Sender<InboundEvent>,
    handle: JoinHandle<LaneReport>,
}

pub struct EventLoop<S, N>
where
    S: DomainStore + 'static,
    N: Notifier + 'static,
{
    engine: Arc<DialogueEngine<S, N>>,
    config: RuntimeConfig,
    lanes: HashMap<ChatId, Lane>,
    report: LoopReport,
}

impl<S, N> EventLoop<S, N>
where
    S: DomainStore + 'static,
    N: Notifier + 'static,
{
    /// Create a loop with no lanes yet
    pub fn new(engine: Arc<DialogueEngine<S, N>>, config: RuntimeConfig) -> Self {
        Self {
            engine,
            config,
            lanes: HashMap::new(),
            report: LoopReport::default(),
        }
    }

    /// Consume `inbound` until every sender is dropped, then drain all lanes
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundEvent>) -> LoopReport {
        info!(
            lane_capacity = self.config.lane_capacity,
            lane_idle_timeout_secs = self.config.lane_idle_timeout_secs,
            "event loop started"
        );

        while let Some(event) = inbound.recv().await {
            self.report.events_received += 1;
            self.route(event).await;
            self.reap_idle_lanes().await;
        }

        let lanes: Vec<Lane> = self.lanes.drain().map(|(_, lane)| lane).collect();
        for lane in lanes {
            self.join(lane).await;
        }

        info!(
            received = self.report.events_received,
            handled = self.report.events_handled,
            lanes = self.report.lanes_spawned,
            "event loop stopped"
        );
        self.report
    }

    async fn route(&mut self, event: InboundEvent) {
        let chat_id = event.chat_id.clone();

        let event = match self.lanes.get(&chat_id) {
            Some(lane) => match lane.sender.send(event).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        // the lane retired between events; let it finish before replacing it
        if let Some(retired) = self.lanes.remove(&chat_id) {
            debug!(%chat_id, "replacing retired lane");
            self.join(retired).await;
        }

        let lane = self.spawn_lane();
        self.report.lanes_spawned += 1;
        if lane.sender.send(event).await.is_err() {
            error!(%chat_id, "new lane refused its first event");
        }
        self.lanes.insert(chat_id, lane);
    }

    fn spawn_lane(&self) -> Lane {
        let (sender, receiver) = mpsc::channel(self.config.lane_capacity.max(1));
        let handle = tokio::spawn(run_lane(
            self.engine.clone(),
            receiver,
            self.config.lane_idle_timeout(),
        ));
        Lane { sender, handle }
    }

    async fn reap_idle_lanes(&mut self) {
        let finished: Vec<ChatId> = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.handle.is_finished())
            .map(|(chat_id, _)| chat_id.clone())
            .collect();

        for chat_id in finished {
            if let Some(lane) = self.lanes.remove(&chat_id) {
                self.join(lane).await;
            }
        }
    }

    async fn join(&mut self, lane: Lane) {
        drop(lane.sender);
        match lane.handle.await {
            Ok(report) => self.report.absorb(report),
            Err(e) => error!(error = %e, "lane task failed"),
        }
    }
}

async fn run_lane<S, N>(
    engine: Arc<DialogueEngine<S, N>>,
    mut receiver: mpsc::Receiver<InboundEvent>,
    idle_timeout: Duration,
) -> LaneReport
where
    S: DomainStore + 'static,
    N: Notifier + 'static,
{
    let mut report = LaneReport::default();
    loop {
        match tokio::time::timeout(idle_timeout, receiver.recv()).await {
            Ok(Some(event)) => handle_one(engine.as_ref(), event, &mut report).await,
            Ok(None) => break,
            Err(_) => {
                receiver.close();
                while let Some(event) = receiver.recv().await {
                    handle_one(engine.as_ref(), event, &mut report).await;
                }
                break;
            }
        }
    }
    report
}

async fn handle_one<S, N>(
    engine: &DialogueEngine<S, N>,
    event: InboundEvent,
    report: &mut LaneReport,
) where
    S: DomainStore,
    N: Notifier,
{
    let events = engine.handle(event).await;
    report.handled += 1;
    report.domain_events += events.len();
    for event in &events {
        log_domain_event(event);
    }
}

fn log_domain_event(event: &DispatchDomainEvent) {
    match serde_json::to_string(event) {
        Ok(payload) => debug!(
            subject = %event.subject(),
            event_type = event.event_type(),
            %payload,
            "domain event"
        ),
        Err(e) => warn!(subject = %event.subject(), error = %e, "unserialisable domain event"),
    }
}

/// Spawn an [`EventLoop`] and return its inbound sender and join handle
pub fn start<S, N>(
    engine: Arc<DialogueEngine<S, N>>,
    config: RuntimeConfig,
) -> (mpsc::Sender<InboundEvent>, JoinHandle<LoopReport>)
where
    S: DomainStore + 'static,
    N: Notifier + 'static,
{
    let (sender, receiver) = mpsc::channel(config.inbound_capacity.max(1));
    let handle = tokio::spawn(EventLoop::new(engine, config).run(receiver));
    (sender, handle)
}
