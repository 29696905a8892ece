// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use std::error::Error as _;
use std::future::Future;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Status plus the body as far as it could be read.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Result<String, TransportError>,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Ok(body.into()),
        }
    }
}

/// Issues the GET behind the tender client. Dropping the returned future
/// abandons the request.
pub trait Transport: Send + Sync + 'static {
    fn get(&self, url: &Url) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("build HTTP client")?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<RawResponse, TransportError> {
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| connection_error(url, &error))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| TransportError::new(format!("read response body: {}", chain(&error))));
        Ok(RawResponse { status, body })
    }
}

fn connection_error(url: &Url, error: &reqwest::Error) -> TransportError {
    TransportError::new(format!("cannot reach {url}: {}", chain(error)))
}

fn chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
