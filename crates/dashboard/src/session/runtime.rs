//! The session task.
//!
//! One task owns the [`SessionState`] and applies commands and fetch
//! completions to it one at a time. Remote calls run as spawned tasks and
//! never touch state directly; their results come back as events.

use std::collections::HashMap;
use std::sync::Arc;

use recommender_core::{InteractionKind, ProductId, UserIdentity, ViewSelector};
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::gateway::{GatewayError, RecommenderApi};

use super::state::{Command, Effect, Event, SessionSettings, SessionState, Ticket};
use super::{Resource, SessionError, SessionSnapshot};

/// Commands buffered before senders wait.
const COMMAND_BUFFER: usize = 64;

enum Control {
    Command(Command),
    Shutdown,
}

/// A running dashboard session.
///
/// Dropping the `Session` without calling [`shutdown`](Self::shutdown) leaves
/// the task running until every [`SessionHandle`] is dropped.
pub struct Session {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

/// Cheaply cloneable entry point for driving a session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Control>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl Session {
    /// Start a session against `gateway`.
    ///
    /// The catalog fetch and the initial identity reaction are issued
    /// immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn<G: RecommenderApi>(
        gateway: G,
        settings: SessionSettings,
        identity: Option<UserIdentity>,
    ) -> Self {
        let mut state = SessionState::new(settings, identity);
        let initial = state.start();

        let (snapshots_tx, snapshots_rx) = watch::channel(state.snapshot());
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);

        let runtime = Runtime {
            gateway: Arc::new(gateway),
            state,
            fetches: JoinSet::new(),
            in_flight: HashMap::new(),
            refreshes: JoinSet::new(),
            snapshots: snapshots_tx,
        };
        let task = tokio::spawn(runtime.run(commands_rx, initial));

        Self {
            handle: SessionHandle {
                commands: commands_tx,
                snapshots: snapshots_rx,
            },
            task,
        }
    }

    /// Get a handle for driving and observing the session.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// End the session, cancelling pending refreshes and in-flight fetches.
    ///
    /// # Errors
    ///
    /// Returns an error if the session task panicked.
    pub async fn shutdown(self) -> Result<(), SessionError> {
        // The task may already be gone; joining below reports how it ended
        let _ = self.handle.commands.send(Control::Shutdown).await;
        self.task.await?;
        Ok(())
    }
}

impl SessionHandle {
    /// Replace the identity. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has ended.
    pub async fn set_identity(&self, identity: Option<UserIdentity>) -> Result<(), SessionError> {
        self.send(Command::SetIdentity(identity)).await
    }

    /// Replace the identity from raw operator input; empty input clears it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has ended.
    pub async fn edit_identity(&self, raw: &str) -> Result<(), SessionError> {
        self.set_identity(UserIdentity::parse(raw).ok()).await
    }

    /// Switch to a random `user_<n>` identity and return it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has ended.
    pub async fn randomize_identity(&self) -> Result<UserIdentity, SessionError> {
        let identity = UserIdentity::random();
        self.set_identity(Some(identity.clone())).await?;
        Ok(identity)
    }

    /// Switch the active view.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has ended.
    pub async fn set_view(&self, view: ViewSelector) -> Result<(), SessionError> {
        self.send(Command::SetView(view)).await
    }

    /// Report an interaction for the current identity.
    ///
    /// Returns once the command is queued; the tracking call and the delayed
    /// refresh happen in the background.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Closed`] if the session has ended.
    pub async fn track_interaction(
        &self,
        product_id: ProductId,
        kind: InteractionKind,
    ) -> Result<(), SessionError> {
        self.send(Command::TrackInteraction { product_id, kind }).await
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every change published after this call.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        let mut receiver = self.snapshots.clone();
        receiver.mark_unchanged();
        receiver
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(Control::Command(command))
            .await
            .map_err(|_| SessionError::Closed)
    }
}

struct Runtime<G> {
    gateway: Arc<G>,
    state: SessionState,
    /// Remote calls in flight; each resolves to the event reporting it.
    fetches: JoinSet<Event>,
    /// What each fetch task reports on, so a task that dies still completes.
    in_flight: HashMap<task::Id, InFlight>,
    /// Delayed refreshes; each resolves to the generation it was scheduled under.
    refreshes: JoinSet<u64>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl<G: RecommenderApi> Runtime<G> {
    async fn run(mut self, mut commands: mpsc::Receiver<Control>, initial: Vec<Effect>) {
        info!(
            user = self.state.identity().map_or("<none>", UserIdentity::as_str),
            "Session started"
        );
        self.execute(initial);
        self.publish();

        loop {
            tokio::select! {
                control = commands.recv() => match control {
                    Some(Control::Command(command)) => self.dispatch(Event::Command(command)),
                    Some(Control::Shutdown) | None => break,
                },
                Some(joined) = self.fetches.join_next_with_id() => match joined {
                    Ok((id, event)) => {
                        self.in_flight.remove(&id);
                        self.dispatch(event);
                    }
                    Err(e) => self.fetch_died(&e),
                },
                Some(joined) = self.refreshes.join_next() => match joined {
                    Ok(generation) => self.dispatch(Event::RefreshDue { generation }),
                    Err(e) => log_join_error("scheduled refresh", &e),
                },
            }
        }

        // Session end is a cancellation point for everything still pending
        self.refreshes.shutdown().await;
        self.fetches.shutdown().await;
        self.in_flight.clear();
        info!("Session ended");
    }

    /// A fetch task panicked or was aborted; report it as a failed call.
    fn fetch_died(&mut self, e: &JoinError) {
        let Some(in_flight) = self.in_flight.remove(&e.id()) else {
            log_join_error("fetch", e);
            return;
        };
        error!(resource = %in_flight.resource(), error = %e, "Fetch task failed");
        self.dispatch(in_flight.failed(e.to_string()));
    }

    fn dispatch(&mut self, event: Event) {
        let effects = self.state.apply(event);
        self.execute(effects);
        self.publish();
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::FetchCatalog => {
                    let gateway = Arc::clone(&self.gateway);
                    let spawned = self.fetches.spawn(
                        async move {
                            let result = gateway.list_products().await;
                            Event::CatalogLoaded(result.map_err(|e| failed(Resource::Catalog, &e)))
                        }
                        .instrument(info_span!("fetch", resource = %Resource::Catalog)),
                    );
                    self.in_flight.insert(spawned.id(), InFlight::Catalog);
                }
                Effect::FetchRecommendations { ticket, count } => {
                    let gateway = Arc::clone(&self.gateway);
                    let span = fetch_span(Resource::Recommendations, &ticket);
                    let in_flight = InFlight::Recommendations(ticket.clone());
                    let spawned = self.fetches.spawn(
                        async move {
                            let result = gateway.recommendations(&ticket.user, count).await;
                            Event::RecommendationsLoaded {
                                result: result.map_err(|e| failed(Resource::Recommendations, &e)),
                                ticket,
                            }
                        }
                        .instrument(span),
                    );
                    self.in_flight.insert(spawned.id(), in_flight);
                }
                Effect::FetchProfile { ticket } => {
                    let gateway = Arc::clone(&self.gateway);
                    let span = fetch_span(Resource::Profile, &ticket);
                    let in_flight = InFlight::Profile(ticket.clone());
                    let spawned = self.fetches.spawn(
                        async move {
                            let result = gateway.profile(&ticket.user).await;
                            Event::ProfileLoaded {
                                result: result.map_err(|e| failed(Resource::Profile, &e)),
                                ticket,
                            }
                        }
                        .instrument(span),
                    );
                    self.in_flight.insert(spawned.id(), in_flight);
                }
                Effect::SubmitTracking { ticket, record } => {
                    let gateway = Arc::clone(&self.gateway);
                    let span = fetch_span(Resource::Tracking, &ticket);
                    let in_flight = InFlight::Tracking(ticket.clone());
                    let spawned = self.fetches.spawn(
                        async move {
                            let result = gateway.track(&ticket.user, &record).await;
                            if result.is_ok() {
                                debug!(product = %record.product_id, kind = %record.kind, "Interaction recorded");
                            }
                            Event::TrackingCompleted {
                                result: result.map_err(|e| failed(Resource::Tracking, &e)),
                                ticket,
                            }
                        }
                        .instrument(span),
                    );
                    self.in_flight.insert(spawned.id(), in_flight);
                }
                Effect::ScheduleRefresh { generation, delay } => {
                    debug!(generation, delay = ?delay, "Scheduling refresh");
                    self.refreshes.spawn(async move {
                        tokio::time::sleep(delay).await;
                        generation
                    });
                }
                Effect::CancelScheduledRefreshes => {
                    if !self.refreshes.is_empty() {
                        debug!(pending = self.refreshes.len(), "Cancelling scheduled refreshes");
                    }
                    self.refreshes.abort_all();
                }
            }
        }
    }

    fn publish(&self) {
        let next = self.state.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// The resource a fetch task reports on.
enum InFlight {
    Catalog,
    Recommendations(Ticket),
    Profile(Ticket),
    Tracking(Ticket),
}

impl InFlight {
    const fn resource(&self) -> Resource {
        match self {
            Self::Catalog => Resource::Catalog,
            Self::Recommendations(_) => Resource::Recommendations,
            Self::Profile(_) => Resource::Profile,
            Self::Tracking(_) => Resource::Tracking,
        }
    }

    /// The completion event for a call that never returned.
    fn failed(self, message: String) -> Event {
        match self {
            Self::Catalog => Event::CatalogLoaded(Err(message)),
            Self::Recommendations(ticket) => Event::RecommendationsLoaded {
                ticket,
                result: Err(message),
            },
            Self::Profile(ticket) => Event::ProfileLoaded {
                ticket,
                result: Err(message),
            },
            Self::Tracking(ticket) => Event::TrackingCompleted {
                ticket,
                result: Err(message),
            },
        }
    }
}

fn fetch_span(resource: Resource, ticket: &Ticket) -> tracing::Span {
    info_span!(
        "fetch",
        resource = %resource,
        user = %ticket.user,
        generation = ticket.generation
    )
}

/// Log a failed remote call and collapse it to a displayable message.
fn failed(resource: Resource, error: &GatewayError) -> String {
    warn!(resource = %resource, error = %error, "Remote call failed");
    error.to_string()
}

fn log_join_error(what: &str, e: &JoinError) {
    if e.is_cancelled() {
        return;
    }
    error!(error = %e, "{what} task failed");
}
