// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tenderboard_api::{RawResponse, StatusCode, Transport, TransportError};
use url::Url;

#[derive(Debug, Clone)]
pub enum Step {
    Respond(StatusCode, String),
    After(Duration, StatusCode, String),
    Fail(String),
    Hang,
}

impl Step {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Respond(StatusCode::OK, body.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// Replays a fixed list of outcomes, one per GET.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Step::fail("script exhausted"))
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, _url: &Url) -> Result<RawResponse, TransportError> {
        match self.next_step() {
            Step::Respond(status, body) => Ok(RawResponse::new(status, body)),
            Step::After(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(RawResponse::new(status, body))
            }
            Step::Fail(message) => Err(TransportError::new(message)),
            Step::Hang => std::future::pending().await,
        }
    }
}
