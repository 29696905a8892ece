// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::time::Duration;
use tenderboard_app::{Tender, TenderList};
use tracing::{debug, info, warn};
use url::Url;

use crate::cancel::{CancelReason, CancelToken};
use crate::transport::{RawResponse, Transport};

pub const TENDERS_ENDPOINT: &str = "api/v1/tenders/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),
    #[error("API error: {status} {status_text}{}", body_suffix(.body))]
    Status {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("invalid API response: expected an array")]
    InvalidShape,
    #[error("decode tender list: {0}")]
    Decode(String),
    #[error("request was cancelled")]
    Cancelled,
}

impl FetchError {
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" - {body}")
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub signal: Option<CancelToken>,
    pub timeout: Duration,
}

impl FetchOptions {
    pub fn with_signal(signal: CancelToken) -> Self {
        Self {
            signal: Some(signal),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            signal: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug)]
pub struct TenderClient<T> {
    endpoint: Url,
    transport: T,
}

impl<T: Transport> TenderClient<T> {
    pub fn new(base_url: &str, transport: T) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }

        let base = Url::parse(&format!("{base_url}/"))
            .with_context(|| format!("parse API base URL {base_url:?}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("API base URL {base_url:?} must use http or https");
        }
        let endpoint = base
            .join(TENDERS_ENDPOINT)
            .with_context(|| format!("build tender endpoint from {base_url:?}"))?;

        Ok(Self {
            endpoint,
            transport,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the full tender list.
    ///
    /// The request runs under an internal token that is cancelled when the
    /// caller's `signal` fires or when `timeout` elapses. Both cases surface
    /// as [`FetchError::Cancelled`].
    pub async fn fetch_tenders(&self, options: FetchOptions) -> Result<TenderList, FetchError> {
        let internal = CancelToken::new();
        if let Some(signal) = &options.signal
            && signal.is_cancelled()
        {
            internal.cancel(CancelReason::Aborted);
        }
        if internal.is_cancelled() {
            debug!(url = %self.endpoint, "tender fetch cancelled before start");
            return Err(FetchError::Cancelled);
        }

        debug!(
            url = %self.endpoint,
            timeout_ms = options.timeout.as_millis() as u64,
            "fetching tenders"
        );

        let outcome = tokio::select! {
            biased;
            reason = internal.cancelled() => Err(reason),
            () = caller_cancelled(options.signal.as_ref()) => {
                Err(trigger(&internal, CancelReason::Aborted))
            }
            () = tokio::time::sleep(options.timeout) => {
                Err(trigger(&internal, CancelReason::TimedOut))
            }
            response = self.transport.get(&self.endpoint) => Ok(response),
        };

        let result = match outcome {
            Err(reason) => {
                debug!(?reason, "tender fetch aborted");
                Err(FetchError::Cancelled)
            }
            Ok(Err(error)) => Err(FetchError::Transport(error.message().to_owned())),
            Ok(Ok(response)) => decode_response(response),
        };

        match &result {
            Ok(tenders) => info!(count = tenders.len(), "tenders fetched"),
            Err(FetchError::Cancelled) => {}
            Err(error) => warn!(%error, "tender fetch failed"),
        }
        result
    }
}

async fn caller_cancelled(signal: Option<&CancelToken>) {
    match signal {
        Some(signal) => {
            signal.cancelled().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn trigger(token: &CancelToken, reason: CancelReason) -> CancelReason {
    token.cancel(reason);
    token.reason().unwrap_or(reason)
}

fn decode_response(response: RawResponse) -> Result<TenderList, FetchError> {
    let RawResponse { status, body } = response;
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            body: body.map(|body| body.trim().to_owned()).unwrap_or_default(),
        });
    }

    let body = body.map_err(|error| FetchError::Transport(error.message().to_owned()))?;
    decode_tender_list(&body)
}

/// Decodes a success body. Anything but a JSON array is a shape error.
/// Records never fail the list: bad fields decode as defaults and an element
/// that is not an object becomes an empty tender in its slot.
pub fn decode_tender_list(body: &str) -> Result<TenderList, FetchError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|error| FetchError::Decode(error.to_string()))?;
    let serde_json::Value::Array(records) = value else {
        return Err(FetchError::InvalidShape);
    };

    Ok(records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value::<Tender>(record).unwrap_or_else(|error| {
                warn!(index, %error, "tender record is not an object");
                Tender::default()
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{FetchError, decode_tender_list};
    use tenderboard_app::Tender;

    #[test]
    fn status_error_message_includes_code_text_and_body() {
        let error = FetchError::Status {
            status: 500,
            status_text: "Internal Server Error".to_owned(),
            body: "oops".to_owned(),
        };
        assert_eq!(error.to_string(), "API error: 500 Internal Server Error - oops");

        let bare = FetchError::Status {
            status: 502,
            status_text: "Bad Gateway".to_owned(),
            body: String::new(),
        };
        assert_eq!(bare.to_string(), "API error: 502 Bad Gateway");
    }

    #[test]
    fn non_array_bodies_are_shape_errors() {
        assert_eq!(
            decode_tender_list(r#"{"not":"array"}"#),
            Err(FetchError::InvalidShape)
        );
        assert_eq!(decode_tender_list("null"), Err(FetchError::InvalidShape));
    }

    #[test]
    fn unparseable_bodies_are_decode_errors() {
        let error = decode_tender_list("<html>").expect_err("html is not json");
        assert!(matches!(error, FetchError::Decode(_)));
    }

    #[test]
    fn malformed_records_keep_their_place_in_the_list() -> Result<(), FetchError> {
        let tenders = decode_tender_list(
            r#"[{"id": 1, "name": "ok", "status": "bidding"}, {"id": "7", "name": "string id"}, 5]"#,
        )?;
        assert_eq!(tenders.len(), 3);
        assert_eq!(tenders[0].id.get(), 1);
        assert_eq!(tenders[0].name, "ok");
        assert_eq!(tenders[1].name, "string id");
        assert_eq!(tenders[1].id.get(), 0);
        assert_eq!(tenders[2], Tender::default());
        Ok(())
    }

    #[test]
    fn arrays_decode_in_order() -> Result<(), FetchError> {
        let tenders = decode_tender_list(r#"[{"id": 3, "name": "b"}, {"id": 1, "name": "a"}]"#)?;
        let ids = tenders.iter().map(|tender| tender.id.get()).collect::<Vec<_>>();
        assert_eq!(ids, vec![3, 1]);
        assert!(decode_tender_list("[]")?.is_empty());
        Ok(())
    }

    #[test]
    fn only_cancellation_reports_is_cancelled() {
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::InvalidShape.is_cancelled());
        assert_eq!(FetchError::Cancelled.to_string(), "request was cancelled");
    }
}
