//! gramflow binary: one-shot workflow run driven by a JSON payload.

use anyhow::{bail, Context, Result};
use clap::Parser;
use gramflow_cli::{build_runner, NdjsonSink, RunPayload, Settings};
use gramflow_core_types::{Account, ProfileId, ProfileRecord, ProfileStatus};
use gramflow_runner::RunExit;
use gramflow_session::sim::SimBackend;
use gramflow_session::{BrowserBackend, SessionConfig};
use gramflow_state_client::{
    HttpClientConfig, HttpStateStore, InMemoryStateStore, ResilientHttpClient, StateStore,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gramflow",
    version,
    about = "Profile automation workflow engine"
)]
struct Cli {
    /// Read the run payload from a file instead of stdin.
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Settings file location.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the configured parallelism for this run.
    #[arg(long)]
    parallelism: Option<usize>,

    /// Run against the in-process simulated browser and state store.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(exit) => exit.code(),
        Err(err) => {
            error!(error = %err, "run aborted before any task was submitted");
            RunExit::ConfigError.code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<RunExit> {
    let settings_path = cli
        .settings
        .clone()
        .unwrap_or_else(Settings::default_path);
    let settings = Settings::load(&settings_path)?;

    let raw = match &cli.payload {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading payload file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading payload from stdin")?;
            buf
        }
    };
    let payload = RunPayload::from_str(&raw).context("parsing run payload")?;

    let mut options = payload
        .options
        .clone()
        .unwrap_or_else(|| settings.run_options());
    if let Some(parallelism) = cli.parallelism {
        options.parallelism = parallelism;
    }

    let accounts = payload.accounts();
    let (store, backend) = collaborators(&cli, &settings, &accounts)?;
    let session_config = SessionConfig {
        root_url: settings
            .get_str("root_url")
            .unwrap_or("https://www.instagram.com/")
            .to_string(),
        ..SessionConfig::default()
    };

    let runner = Arc::new(build_runner(
        store,
        backend,
        Arc::new(NdjsonSink::new()),
        options,
        session_config,
    ));

    // Ctrl-C is the external stop request: cooperative, no hard kill.
    {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                runner.stop();
            }
        });
    }

    Ok(runner.run(accounts, payload.workflow).await)
}

fn collaborators(
    cli: &Cli,
    settings: &Settings,
    accounts: &[Account],
) -> Result<(Arc<dyn StateStore>, Arc<dyn BrowserBackend>)> {
    if cli.dry_run {
        info!("dry run: simulated browser and in-memory state store");
        let store = InMemoryStateStore::new();
        for account in accounts {
            store.insert_profile(ProfileRecord {
                profile_id: ProfileId(account.username.clone()),
                name: account.username.clone(),
                proxy: account.proxy.clone(),
                user_agent: None,
                status: ProfileStatus::Idle,
                using: false,
                sessions_today: 0,
                last_opened_at: None,
            });
        }
        return Ok((Arc::new(store), Arc::new(SimBackend::new())));
    }

    let base_url = settings.get_str("state_store_url").context(
        "state_store_url is not configured; set it in the settings file or pass --dry-run",
    )?;
    let client = ResilientHttpClient::new(HttpClientConfig {
        base_url: base_url.to_string(),
        secret: settings
            .get_str("state_store_secret")
            .unwrap_or_default()
            .to_string(),
        ..HttpClientConfig::default()
    })?;
    let store: Arc<dyn StateStore> = Arc::new(HttpStateStore::new(client));

    // The real browser driver is supplied by the embedding application;
    // "sim" is the only backend built into this binary.
    let backend: Arc<dyn BrowserBackend> = match settings.get_str("browser_backend").unwrap_or("sim")
    {
        "sim" => Arc::new(SimBackend::new()),
        other => bail!("unknown browser backend '{other}'"),
    };
    Ok((store, backend))
}
