// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::time::Duration;
use tenderboard_app::{Tender, TenderList};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cancel::{CancelReason, CancelToken};
use crate::client::{DEFAULT_TIMEOUT, FetchError, FetchOptions, TenderClient};
use crate::transport::Transport;

pub const AUTO_RETRY_DELAY: Duration = Duration::from_millis(700);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
pub enum ControllerEvent {
    Fetched {
        request_id: u64,
        result: Result<TenderList, FetchError>,
    },
    RetryDue {
        retry_id: u64,
    },
}

#[derive(Debug)]
struct InFlight {
    request_id: u64,
    token: CancelToken,
}

#[derive(Debug)]
struct PendingRetry {
    retry_id: u64,
    task: JoinHandle<()>,
}

/// Owns the tender fetch lifecycle for one mounted dashboard.
///
/// Work runs on the tokio runtime behind `runtime`; results come back as
/// [`ControllerEvent`]s and are applied on the owner's thread through
/// [`ListController::pump`] or [`ListController::next_event`]. A result is
/// applied only if it belongs to the current request and that request's token
/// was never cancelled.
pub struct ListController<T: Transport> {
    client: Arc<TenderClient<T>>,
    runtime: Handle,
    timeout: Duration,
    tx: UnboundedSender<ControllerEvent>,
    rx: UnboundedReceiver<ControllerEvent>,
    phase: LoadPhase,
    tenders: TenderList,
    generation: u64,
    has_attempted: bool,
    active: bool,
    in_flight: Option<InFlight>,
    pending_retry: Option<PendingRetry>,
    next_id: u64,
}

impl<T: Transport> ListController<T> {
    pub fn new(client: Arc<TenderClient<T>>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            client,
            runtime,
            timeout: DEFAULT_TIMEOUT,
            tx,
            rx,
            phase: LoadPhase::Idle,
            tenders: Vec::new(),
            generation: 0,
            has_attempted: false,
            active: false,
            in_flight: None,
            pending_retry: None,
            next_id: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            LoadPhase::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Last successfully fetched list.
    pub fn tenders(&self) -> &[Tender] {
        &self.tenders
    }

    /// Bumped on every successful fetch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_attempted(&self) -> bool {
        self.has_attempted
    }

    pub fn has_pending_retry(&self) -> bool {
        self.pending_retry.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn client(&self) -> &TenderClient<T> {
        &self.client
    }

    /// Starts the initial load, tearing down any previous activation first.
    pub fn activate(&mut self) {
        if self.active {
            self.deactivate();
        }
        self.active = true;
        info!(url = %self.client.endpoint(), "tender list activated");
        self.start_fetch();
    }

    /// User-requested reload. Always allowed; drops a pending auto-retry.
    pub fn retry(&mut self) {
        self.active = true;
        self.cancel_pending_retry();
        info!("manual tender reload");
        self.start_fetch();
    }

    /// Cancels the in-flight fetch and any scheduled auto-retry.
    pub fn deactivate(&mut self) {
        self.active = false;
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.token.cancel(CancelReason::Aborted);
            debug!(request_id = in_flight.request_id, "cancelled in-flight fetch");
        }
        if self.phase == LoadPhase::Loading {
            self.phase = LoadPhase::Idle;
        }
        self.cancel_pending_retry();
    }

    /// Applies every event that is already queued. Returns whether any
    /// observable state changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.handle_event(event);
        }
        changed
    }

    /// Waits for the next event and applies it.
    pub async fn next_event(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    pub fn handle_event(&mut self, event: ControllerEvent) -> bool {
        match event {
            ControllerEvent::Fetched { request_id, result } => self.apply_fetch(request_id, result),
            ControllerEvent::RetryDue { retry_id } => {
                let due = self
                    .pending_retry
                    .as_ref()
                    .is_some_and(|pending| pending.retry_id == retry_id);
                if !due || !self.active {
                    return false;
                }
                self.pending_retry = None;
                info!("auto-retrying tender fetch");
                self.start_fetch();
                true
            }
        }
    }

    fn start_fetch(&mut self) {
        if let Some(previous) = self.in_flight.take() {
            previous.token.cancel(CancelReason::Aborted);
        }

        let request_id = self.next_id();
        let token = CancelToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            token: token.clone(),
        });
        self.phase = LoadPhase::Loading;

        let client = Arc::clone(&self.client);
        let tx = self.tx.clone();
        let options = FetchOptions::with_signal(token).timeout(self.timeout);
        debug!(request_id, "spawning tender fetch");
        self.runtime.spawn(async move {
            let result = client.fetch_tenders(options).await;
            let _ = tx.send(ControllerEvent::Fetched { request_id, result });
        });
    }

    fn apply_fetch(&mut self, request_id: u64, result: Result<TenderList, FetchError>) -> bool {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.request_id == request_id);
        if !current {
            debug!(request_id, "discarding stale fetch result");
            return false;
        }
        if let Some(in_flight) = self.in_flight.take_if(|in_flight| in_flight.token.is_cancelled()) {
            debug!(request_id = in_flight.request_id, "discarding cancelled fetch result");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(tenders) => {
                self.tenders = tenders;
                self.generation = self.generation.saturating_add(1);
                self.has_attempted = true;
                self.phase = LoadPhase::Loaded;
            }
            Err(error) => {
                // A timeout cancels the client's own token, not ours, so it is
                // reported like any other failure.
                if error.is_cancelled() {
                    info!(request_id, "tender fetch timed out");
                }
                let message = error.to_string();
                self.phase = LoadPhase::Failed(message);
                if !self.has_attempted {
                    self.has_attempted = true;
                    self.schedule_retry();
                } else {
                    warn!(%error, "tender fetch failed; waiting for manual retry");
                }
            }
        }
        true
    }

    fn schedule_retry(&mut self) {
        let retry_id = self.next_id();
        let tx = self.tx.clone();
        info!(
            delay_ms = AUTO_RETRY_DELAY.as_millis() as u64,
            "scheduling automatic tender retry"
        );
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(AUTO_RETRY_DELAY).await;
            let _ = tx.send(ControllerEvent::RetryDue { retry_id });
        });
        self.pending_retry = Some(PendingRetry { retry_id, task });
    }

    fn cancel_pending_retry(&mut self) {
        if let Some(pending) = self.pending_retry.take() {
            pending.task.abort();
            debug!(retry_id = pending.retry_id, "cancelled scheduled auto-retry");
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}

impl<T: Transport> Drop for ListController<T> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
