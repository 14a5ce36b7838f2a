//! Debounced request controller for one widget.
//!
//! Each controller owns its view and runs as a single task. Inputs restart a
//! quiet-period timer; when it elapses the latest input is dispatched with a
//! fresh sequence number. Only the response carrying the latest sequence is
//! applied, so a slow older request can never overwrite a newer one.

use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use super::render::{render_all, RenderOptions};
use super::transport::{SearchOutcome, SearchTransport, TransportError};
use super::view::{ResultsView, Tab, FAILURE_MESSAGE, NETWORK_ERROR_MESSAGE};
use super::WidgetConfig;

/// Quiet period before an input is dispatched
pub const DEBOUNCE: Duration = Duration::from_millis(250);

/// User interactions a widget reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Input(String),
    Escape,
    ClickOutside,
    SwitchTab(Tab),
}

type InFlight = FuturesUnordered<BoxFuture<'static, (u64, Result<SearchOutcome, TransportError>)>>;

/// Handle to a running widget controller
pub struct SearchController {
    id: Uuid,
    events: mpsc::UnboundedSender<WidgetEvent>,
    view: watch::Receiver<ResultsView>,
    task: JoinHandle<()>,
}

impl SearchController {
    /// Start a controller with the standard quiet period
    pub fn spawn(config: WidgetConfig, transport: Arc<dyn SearchTransport>) -> Self {
        Self::spawn_with_debounce(config, transport, DEBOUNCE)
    }

    pub fn spawn_with_debounce(
        config: WidgetConfig,
        transport: Arc<dyn SearchTransport>,
        debounce: Duration,
    ) -> Self {
        let id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(ResultsView::default());

        let state = ControllerState {
            id,
            render_options: config.render_options(),
            config,
            transport,
            debounce,
            view: ResultsView::default(),
            view_tx,
            pending: None,
            deadline: None,
            latest_seq: 0,
        };
        let task = tokio::spawn(state.run(events_rx));

        Self {
            id,
            events: events_tx,
            view: view_rx,
            task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn send(&self, event: WidgetEvent) {
        if self.events.send(event).is_err() {
            debug!("Widget {} is no longer running", self.id);
        }
    }

    pub fn input(&self, text: impl Into<String>) {
        self.send(WidgetEvent::Input(text.into()));
    }

    pub fn escape(&self) {
        self.send(WidgetEvent::Escape);
    }

    pub fn click_outside(&self) {
        self.send(WidgetEvent::ClickOutside);
    }

    pub fn switch_tab(&self, tab: Tab) {
        self.send(WidgetEvent::SwitchTab(tab));
    }

    /// Snapshot of the current view
    pub fn view(&self) -> ResultsView {
        self.view.borrow().clone()
    }

    /// Wait until the view satisfies `predicate`; None if the controller stopped first
    pub async fn wait_until(&self, predicate: impl FnMut(&ResultsView) -> bool) -> Option<ResultsView> {
        let mut view = self.view.clone();
        let snapshot = view.wait_for(predicate).await.ok().map(|v| v.clone());
        snapshot
    }

    /// `wait_until` bounded by `limit`
    pub async fn wait_until_within(
        &self,
        limit: Duration,
        predicate: impl FnMut(&ResultsView) -> bool,
    ) -> anyhow::Result<ResultsView> {
        tokio::time::timeout(limit, self.wait_until(predicate))
            .await
            .map_err(|_| anyhow::anyhow!("widget {} did not settle within {:?}", self.id, limit))?
            .ok_or_else(|| anyhow::anyhow!("widget {} stopped", self.id))
    }

    /// Stop taking events; in-flight requests are dropped
    pub async fn shutdown(self) {
        drop(self.events);
        if let Err(e) = self.task.await {
            warn!("Widget {} task failed: {}", self.id, e);
        }
    }
}

/// What woke the controller loop
enum Step {
    Event(Option<WidgetEvent>),
    Fire,
    Resolved(u64, Result<SearchOutcome, TransportError>),
}

struct ControllerState {
    id: Uuid,
    config: WidgetConfig,
    render_options: RenderOptions,
    transport: Arc<dyn SearchTransport>,
    debounce: Duration,
    view: ResultsView,
    view_tx: watch::Sender<ResultsView>,
    /// Latest input waiting for the quiet period to end
    pending: Option<String>,
    deadline: Option<Instant>,
    /// Sequence of the most recent dispatch; older responses are stale
    latest_seq: u64,
}

impl ControllerState {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<WidgetEvent>) {
        let mut in_flight: InFlight = FuturesUnordered::new();

        loop {
            let deadline = self.deadline;
            let step = tokio::select! {
                event = events.recv() => Step::Event(event),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Step::Fire,
                Some((seq, outcome)) = in_flight.next(), if !in_flight.is_empty() => Step::Resolved(seq, outcome),
            };

            match step {
                Step::Event(Some(event)) => self.handle_event(event),
                Step::Event(None) => break,
                Step::Fire => self.dispatch(&mut in_flight),
                Step::Resolved(seq, outcome) => self.resolve(seq, outcome),
            }
        }

        debug!("Widget {} stopped", self.id);
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view.clone());
    }

    fn handle_event(&mut self, event: WidgetEvent) {
        match event {
            WidgetEvent::Input(text) => {
                self.pending = Some(text);
                self.deadline = Some(Instant::now() + self.debounce);
            }
            WidgetEvent::Escape | WidgetEvent::ClickOutside => {
                self.view.hide();
                self.publish();
            }
            WidgetEvent::SwitchTab(tab) => {
                self.view.switch_tab(tab);
                self.publish();
            }
        }
    }

    /// The quiet period elapsed: send the pending input, or clear the view if it is too short
    fn dispatch(&mut self, in_flight: &mut InFlight) {
        self.deadline = None;
        let text = self.pending.take().unwrap_or_default();
        let text = text.trim();

        // Any response still in flight is stale from here on
        self.latest_seq += 1;
        let seq = self.latest_seq;

        if text.chars().count() < self.config.min_chars {
            self.view.hide();
            self.view.loading = false;
            self.publish();
            return;
        }

        debug!("Widget {} dispatching #{} for {:?}", self.id, seq, text);
        self.view.loading = true;
        self.publish();

        let query = self.config.query(text);
        let transport = self.transport.clone();
        in_flight.push(Box::pin(async move {
            let outcome = transport.search(&query).await;
            (seq, outcome)
        }));
    }

    fn resolve(&mut self, seq: u64, outcome: Result<SearchOutcome, TransportError>) {
        if seq != self.latest_seq {
            debug!(
                "Widget {} discarding stale response #{} (latest #{})",
                self.id, seq, self.latest_seq
            );
            return;
        }

        self.view.loading = false;
        match outcome {
            Ok(SearchOutcome::Results(response)) => {
                render_all(&mut self.view, &response, &self.render_options);
                self.view.switch_tab(Tab::Watches);
            }
            Ok(SearchOutcome::Failed(message)) => {
                warn!(
                    "Widget {} search failed: {}",
                    self.id,
                    message.as_deref().unwrap_or("no message")
                );
                self.view.show_error(FAILURE_MESSAGE);
            }
            Err(e) => {
                warn!("Widget {} request error: {}", self.id, e);
                self.view.show_error(NETWORK_ERROR_MESSAGE);
            }
        }
        self.publish();
    }
}
