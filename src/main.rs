/*!
 * Caravan - bulk media-session uploader
 */

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use uuid::Uuid;

use caravan::config::{ErrorPolicy, LogLevel, UploadConfig, DEFAULT_PART_SIZE};
use caravan::error::{CaravanError, Result, EXIT_SUCCESS};
use caravan::logging::init_logging;
use caravan::manifest::resolve_directory;
use caravan::output::write_results;
use caravan::rest::RestJobClient;
use caravan::transfer::HttpStoreBackend;
use caravan::{StatusPoller, TransferEngine, UploadOrchestrator};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Strict,
    Lenient,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<PolicyArg> for ErrorPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => ErrorPolicy::Strict,
            PolicyArg::Lenient => ErrorPolicy::Lenient,
        }
    }
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

/// Upload locally captured sessions to a content platform
#[derive(Debug, Parser)]
#[command(name = "caravan", version, about)]
struct Cli {
    /// Server domain name (no scheme), e.g. demo.hosted.example.com
    #[arg(long)]
    server: String,

    /// Session authentication cookie value, acquired out of band
    #[arg(long, env = "CARAVAN_AUTH_COOKIE", hide_env_values = true)]
    auth_cookie: String,

    /// Directory to scan recursively for session manifests
    #[arg(long)]
    directory: PathBuf,

    /// Destination folder id on the server
    #[arg(long)]
    folder_id: Uuid,

    /// Write final job states to this JSON file
    #[arg(long)]
    output: Option<PathBuf>,

    /// How to react to per-manifest and per-file failures
    #[arg(long, value_enum, default_value = "strict")]
    error_policy: PolicyArg,

    /// Accept invalid TLS certificates (self-signed test servers)
    #[arg(long)]
    accept_invalid_certs: bool,

    /// Multipart part size in bytes
    #[arg(long, default_value_t = DEFAULT_PART_SIZE)]
    part_size: u64,

    /// Maximum parts of one file in flight at once
    #[arg(long, default_value_t = 4)]
    max_in_flight_parts: usize,

    /// Seconds between status-poll rounds
    #[arg(long, default_value_t = 10)]
    poll_interval: u64,

    /// Overall polling deadline in seconds
    #[arg(long, default_value_t = 6 * 60 * 60)]
    poll_timeout: u64,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 300)]
    request_timeout: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevelArg,

    /// Log to this file as JSON instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> UploadConfig {
        UploadConfig {
            server: self.server,
            auth_cookie: self.auth_cookie,
            directory: self.directory,
            folder_id: self.folder_id,
            output_file: self.output,
            error_policy: self.error_policy.into(),
            accept_invalid_certs: self.accept_invalid_certs,
            part_size: self.part_size,
            max_in_flight_parts: self.max_in_flight_parts,
            poll_interval_secs: self.poll_interval,
            poll_timeout_secs: self.poll_timeout,
            request_timeout_secs: self.request_timeout,
            log_level: self.log_level.into(),
            log_file: self.log_file,
            verbose: self.verbose,
        }
    }
}

fn build_http_client(config: &UploadConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(config.request_timeout());
    if config.accept_invalid_certs {
        warn!("TLS certificate verification disabled for this run");
        builder = builder.danger_accept_invalid_certs(true);
    }
    builder
        .build()
        .map_err(|e| CaravanError::Config(format!("failed to build HTTP client: {e}")))
}

async fn run(config: UploadConfig) -> Result<()> {
    info!(
        server = %config.server,
        directory = %config.directory.display(),
        folder_id = %config.folder_id,
        "starting upload run"
    );

    let set = resolve_directory(&config.directory)?;
    info!(
        manifests = set.manifests.len(),
        errors = set.errors.len(),
        "directory resolved"
    );
    if set.manifests.is_empty() && set.errors.is_empty() {
        warn!("no session manifests found, nothing to do");
        return Ok(());
    }

    // One client for the whole run; TLS trust and timeout are per-client,
    // never process-global.
    let client = build_http_client(&config)?;
    let jobs = RestJobClient::new(
        client.clone(),
        config.rest_base_url(),
        config.auth_cookie.clone(),
    );
    let engine = TransferEngine::new(
        HttpStoreBackend::new(client),
        config.part_size,
        config.max_in_flight_parts,
    );

    let orchestrator =
        UploadOrchestrator::new(&jobs, &engine, config.folder_id, config.error_policy);
    let mut uploads = orchestrator.start_uploads(&set).await?;
    info!(jobs = uploads.len(), "all uploads transferred, polling for processing");

    let poller = StatusPoller::new(
        &jobs,
        config.poll_interval(),
        config.poll_timeout(),
        config.error_policy,
    );
    let poll_outcome = poller.wait(&mut uploads).await;

    // Last known states go out even when polling gave up.
    if let Some(path) = &config.output_file {
        write_results(path, &uploads)?;
    }
    poll_outcome?;

    info!("upload run finished");
    Ok(())
}

#[tokio::main]
async fn main() {
    let mut config = Cli::parse().into_config();
    if config.verbose {
        config.log_level = LogLevel::Debug;
    }

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        process::exit(e.exit_code());
    }
    if let Err(e) = init_logging(&config) {
        eprintln!("error: {e}");
        process::exit(e.exit_code());
    }

    match run(config).await {
        Ok(()) => process::exit(EXIT_SUCCESS),
        Err(e) => {
            error!(error = %e, "upload run failed");
            process::exit(e.exit_code());
        }
    }
}
