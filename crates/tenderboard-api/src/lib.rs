// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod cancel;
pub mod client;
pub mod controller;
pub mod transport;

pub use cancel::{CancelReason, CancelToken};
pub use client::{
    DEFAULT_TIMEOUT, FetchError, FetchOptions, TENDERS_ENDPOINT, TenderClient, decode_tender_list,
};
pub use controller::{AUTO_RETRY_DELAY, ControllerEvent, ListController, LoadPhase};
pub use reqwest::StatusCode;
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
