// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::{DEMO_BASE_URL, DEMO_LATENCY, DemoTransport, SystemOpener, TenderRuntime};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tenderboard_api::{HttpTransport, ListController, TenderClient, Transport};
use tenderboard_app::AppState;
use tenderboard_tui::UiOptions;
use tracing::{info, warn};

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `tenderboard --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    // Resolved before the async runtime starts any threads.
    let ui_options = UiOptions {
        utc_offset: config.utc_offset(),
        skeleton_cards: config.skeleton_cards(),
    };
    let timeout = config.api_timeout()?;
    let redirect_url = config.redirect_url()?;
    let base_url = if options.demo {
        DEMO_BASE_URL.to_owned()
    } else {
        config.api_base_url()
    };

    if options.check_only {
        TenderClient::new(&base_url, HttpTransport::new()?).with_context(|| {
            format!(
                "invalid API base URL {base_url:?}; fix [api].base_url or {}",
                config::API_BASE_URL_ENV
            )
        })?;
        println!("config ok: {}", options.config_path.display());
        return Ok(());
    }

    let log_file = config.log_file()?;
    if let Err(error) = logging::init_file_logging(&log_file, config.log_level()) {
        eprintln!("logging disabled: {error:#}");
    }
    info!(
        config = %options.config_path.display(),
        base_url = %base_url,
        demo = options.demo,
        "starting tenderboard"
    );

    let async_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("tenderboard-io")
        .enable_all()
        .build()
        .context("start async runtime")?;
    let launch = Launch {
        handle: async_runtime.handle().clone(),
        timeout,
        redirect_url,
        ui_options,
    };

    let opened = if options.demo {
        launch.run(TenderClient::new(&base_url, DemoTransport::new(DEMO_LATENCY)?)?)?
    } else {
        let client = TenderClient::new(&base_url, HttpTransport::new()?).with_context(|| {
            format!(
                "invalid API base URL {base_url:?}; fix [api].base_url or {}",
                config::API_BASE_URL_ENV
            )
        })?;
        launch.run(client)?
    };

    if let Some(url) = opened {
        println!("opened {url}");
    }
    Ok(())
}

struct Launch {
    handle: tokio::runtime::Handle,
    timeout: std::time::Duration,
    redirect_url: url::Url,
    ui_options: UiOptions,
}

impl Launch {
    /// Runs the dashboard; returns the portal URL the user left for, if any.
    fn run<T: Transport>(self, client: TenderClient<T>) -> Result<Option<url::Url>> {
        let controller =
            ListController::new(Arc::new(client), self.handle).with_timeout(self.timeout);
        let mut runtime = TenderRuntime::new(controller, self.redirect_url, SystemOpener);
        let mut state = AppState::default();

        let result = tenderboard_tui::run_app(&mut state, &mut runtime, self.ui_options);
        if let Err(error) = &result {
            warn!(error = %format!("{error:#}"), "dashboard exited with an error");
        }
        result?;
        Ok(runtime.opened().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("tenderboard - RED PETROLEUM tender dashboard");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Show built-in sample tenders instead of calling the API");
    println!("  --check                  Validate config and API base URL, then exit");
    println!("  --help                   Show this help");
    println!();
    println!("environment:");
    println!("  {}   Override [api].base_url", config::API_BASE_URL_ENV);
    println!("  {}    Config file location", config::CONFIG_PATH_ENV);
    println!("  RUST_LOG                   Log filter (default from [log].level)");
}
