// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::time::Duration;
use tenderboard_api::{
    ListController, LoadPhase, RawResponse, StatusCode, Transport, TransportError,
};
use tenderboard_app::{PortalAction, Tender};
use tenderboard_tui::{AppRuntime, LoadState};
use tracing::info;
use url::Url;

pub const DEMO_BASE_URL: &str = "http://demo.tenderboard.invalid";
pub const DEMO_LATENCY: Duration = Duration::from_millis(600);

pub trait PortalOpener {
    fn open(&mut self, url: &Url) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct SystemOpener;

impl PortalOpener for SystemOpener {
    fn open(&mut self, url: &Url) -> Result<()> {
        open::that(url.as_str()).with_context(|| format!("open {url} in the system browser"))
    }
}

/// Serves the built-in sample tenders after a short delay so the loading
/// state is visible.
#[derive(Debug, Clone)]
pub struct DemoTransport {
    body: String,
    latency: Duration,
}

impl DemoTransport {
    pub fn new(latency: Duration) -> Result<Self> {
        let body = tenderboard_testkit::tenders_json(&tenderboard_testkit::demo_tenders())?;
        Ok(Self { body, latency })
    }
}

impl Transport for DemoTransport {
    async fn get(&self, _url: &Url) -> Result<RawResponse, TransportError> {
        tokio::time::sleep(self.latency).await;
        Ok(RawResponse::new(StatusCode::OK, self.body.clone()))
    }
}

/// Connects the dashboard to a list controller and the portal opener.
pub struct TenderRuntime<T: Transport, O: PortalOpener> {
    controller: ListController<T>,
    redirect_url: Url,
    opener: O,
    opened: Option<Url>,
}

impl<T: Transport, O: PortalOpener> TenderRuntime<T, O> {
    pub fn new(controller: ListController<T>, redirect_url: Url, opener: O) -> Self {
        Self {
            controller,
            redirect_url,
            opener,
            opened: None,
        }
    }

    /// The portal page handed to the opener, if the user left the dashboard.
    pub fn opened(&self) -> Option<&Url> {
        self.opened.as_ref()
    }

    pub fn portal_url(&self, _action: PortalAction) -> &Url {
        &self.redirect_url
    }
}

impl<T: Transport, O: PortalOpener> AppRuntime for TenderRuntime<T, O> {
    fn activate(&mut self) {
        self.controller.activate();
    }

    fn deactivate(&mut self) {
        self.controller.deactivate();
    }

    fn pump(&mut self) -> bool {
        self.controller.pump()
    }

    fn load_state(&self) -> LoadState {
        match self.controller.phase() {
            LoadPhase::Idle | LoadPhase::Loading => LoadState::Loading,
            LoadPhase::Failed(message) => LoadState::Failed(message.clone()),
            LoadPhase::Loaded => LoadState::Ready,
        }
    }

    fn tenders(&self) -> &[Tender] {
        self.controller.tenders()
    }

    fn generation(&self) -> u64 {
        self.controller.generation()
    }

    fn retry(&mut self) {
        self.controller.retry();
    }

    fn open_portal(&mut self, action: PortalAction) -> Result<String> {
        let url = self.portal_url(action).clone();
        info!(action = action.label(), %url, "redirecting to portal");
        self.opener.open(&url)?;
        let opened = url.to_string();
        self.opened = Some(url);
        Ok(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::{DEMO_BASE_URL, DEMO_LATENCY, DemoTransport, PortalOpener, TenderRuntime};
    use anyhow::{Result, anyhow, bail};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};
    use tenderboard_api::{HttpTransport, ListController, TenderClient, Transport};
    use tenderboard_app::{PortalAction, TenderId};
    use tenderboard_testkit::demo_tenders;
    use tenderboard_tui::{AppRuntime, LoadState};
    use tiny_http::{Response, Server};
    use url::Url;

    #[derive(Debug, Default)]
    struct RecordingOpener {
        opened: Vec<String>,
        fail: bool,
    }

    impl PortalOpener for RecordingOpener {
        fn open(&mut self, url: &Url) -> Result<()> {
            if self.fail {
                bail!("no browser available");
            }
            self.opened.push(url.to_string());
            Ok(())
        }
    }

    fn async_runtime() -> Result<tokio::runtime::Runtime> {
        Ok(tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?)
    }

    fn redirect() -> Result<Url> {
        Ok(Url::parse("https://portal.example.kg/admin/login/?next=/admin/")?)
    }

    fn runtime_for<T: Transport>(
        rt: &tokio::runtime::Runtime,
        base_url: &str,
        transport: T,
    ) -> Result<TenderRuntime<T, RecordingOpener>> {
        let client = TenderClient::new(base_url, transport)?;
        let controller = ListController::new(Arc::new(client), rt.handle().clone());
        Ok(TenderRuntime::new(
            controller,
            redirect()?,
            RecordingOpener::default(),
        ))
    }

    fn wait_for_settled<T: Transport>(
        runtime: &mut TenderRuntime<T, RecordingOpener>,
    ) -> LoadState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            runtime.pump();
            let state = runtime.load_state();
            if state != LoadState::Loading || Instant::now() > deadline {
                return state;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn demo_transport_serves_sample_tenders() -> Result<()> {
        let rt = async_runtime()?;
        let transport = DemoTransport::new(Duration::from_millis(5))?;
        let mut runtime = runtime_for(&rt, DEMO_BASE_URL, transport)?;

        assert_eq!(runtime.load_state(), LoadState::Loading);
        runtime.activate();
        assert_eq!(wait_for_settled(&mut runtime), LoadState::Ready);
        assert_eq!(runtime.tenders(), demo_tenders().as_slice());
        assert_eq!(runtime.generation(), 1);
        Ok(())
    }

    #[test]
    fn http_runtime_loads_from_server() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let body = tenderboard_testkit::tenders_json(&demo_tenders()[..2])?;
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/api/v1/tenders/");
            request
                .respond(Response::from_string(body))
                .expect("response should succeed");
        });

        let rt = async_runtime()?;
        let mut runtime = runtime_for(&rt, &addr, HttpTransport::new()?)?;
        runtime.activate();
        assert_eq!(wait_for_settled(&mut runtime), LoadState::Ready);
        assert_eq!(runtime.tenders().len(), 2);

        handle.join().map_err(|_| anyhow!("server thread panicked"))?;
        Ok(())
    }

    #[test]
    fn server_failure_surfaces_as_failed_state() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            request
                .respond(Response::from_string("maintenance").with_status_code(503))
                .expect("response should succeed");
        });

        let rt = async_runtime()?;
        let mut runtime = runtime_for(&rt, &addr, HttpTransport::new()?)?;
        runtime.activate();
        let LoadState::Failed(message) = wait_for_settled(&mut runtime) else {
            bail!("expected a failed load");
        };
        assert!(message.contains("503"), "{message}");
        assert!(message.contains("maintenance"), "{message}");

        runtime.deactivate();
        handle.join().map_err(|_| anyhow!("server thread panicked"))?;
        Ok(())
    }

    #[test]
    fn every_portal_action_uses_the_redirect_url() -> Result<()> {
        let rt = async_runtime()?;
        let mut runtime = runtime_for(&rt, DEMO_BASE_URL, DemoTransport::new(DEMO_LATENCY)?)?;

        for action in [
            PortalAction::Login,
            PortalAction::MyBids,
            PortalAction::Users,
            PortalAction::Settings,
            PortalAction::OpenTender(TenderId::new(3)),
        ] {
            assert_eq!(runtime.open_portal(action)?, redirect()?.as_str());
        }
        assert_eq!(runtime.opener.opened.len(), 5);
        assert_eq!(runtime.opened(), Some(&redirect()?));
        Ok(())
    }

    #[test]
    fn opener_failure_is_reported_and_not_recorded() -> Result<()> {
        let rt = async_runtime()?;
        let mut runtime = runtime_for(&rt, DEMO_BASE_URL, DemoTransport::new(DEMO_LATENCY)?)?;
        runtime.opener.fail = true;

        let error = runtime
            .open_portal(PortalAction::Login)
            .expect_err("failing opener should error");
        assert!(error.to_string().contains("no browser"));
        assert_eq!(runtime.opened(), None);
        Ok(())
    }
}
