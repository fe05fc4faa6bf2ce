//! ixrlib - talk to the iXRLib service from a terminal.
//!
//! Reads the device identity from `IXRLIB_*` environment variables (or a
//! `.env` file) and runs one command against the service.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ixrlib_core::auth::{KeyValueStore, Session};
use ixrlib_core::models::{
    Event, EventBatch, LogBatch, LogEntry, Prompt, TelemetryBatch, TelemetryEntry,
};
use ixrlib_core::{
    ApiClient, ApiResponse, AuthRequest, ClientConfig, CredentialStore, FileStore, KeyringStore,
    MemoryStore,
};

const USAGE: &str = "\
Usage: ixrlib <command> [args]

Commands:
  ping                      Check authentication against the service
  config                    Fetch the remote application config
  event <name> [meta-json]  Record an event
  log <level> <text>        Record a log line
  telemetry <name> <json>   Record a telemetry sample
  prompt <text>             Send a prompt to the LLM proxy
  status                    Show the stored session
  logout                    Forget stored credentials

Environment:
  IXRLIB_APP_ID, IXRLIB_ORG_ID, IXRLIB_DEVICE_ID, IXRLIB_AUTH_SECRET (required)
  IXRLIB_USER_ID, IXRLIB_SESSION_ID                                 (optional)
  IXRLIB_STORE = file | keyring | memory                            (default: file)
  IXRLIB_LOG_DIR  also write daily log files into this directory
";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var("IXRLIB_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ixrlib.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

fn required_var(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} is not set", key))
}

fn auth_request_from_env() -> Result<AuthRequest> {
    let mut request = AuthRequest::new(
        required_var("IXRLIB_APP_ID")?,
        required_var("IXRLIB_ORG_ID")?,
        required_var("IXRLIB_DEVICE_ID")?,
        required_var("IXRLIB_AUTH_SECRET")?,
    );
    if let Ok(user_id) = std::env::var("IXRLIB_USER_ID") {
        request = request.with_user_id(user_id);
    }
    if let Ok(session_id) = std::env::var("IXRLIB_SESSION_ID") {
        request = request.with_session_id(session_id);
    }
    request.app_version = Some(env!("CARGO_PKG_VERSION").to_string());
    Ok(request)
}

fn credential_store() -> Result<CredentialStore> {
    let kind = std::env::var("IXRLIB_STORE").unwrap_or_else(|_| "file".to_string());
    let backend: Arc<dyn KeyValueStore> = match kind.as_str() {
        "file" => Arc::new(FileStore::in_dir(ClientConfig::cache_dir()?)),
        "keyring" => Arc::new(KeyringStore::default()),
        "memory" => Arc::new(MemoryStore::new()),
        other => bail!("Unknown IXRLIB_STORE {:?} (expected file, keyring or memory)", other),
    };
    Ok(CredentialStore::new(backend))
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_object(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("Argument is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("Expected a JSON object, got {}", raw),
    }
}

fn print_response(response: &ApiResponse) -> Result<()> {
    eprintln!("{} {}", response.status.as_u16(), response.status_text);
    if !response.data.is_null() {
        println!("{}", serde_json::to_string_pretty(&response.data)?);
    }
    Ok(())
}

fn print_status(session: &Session) {
    match session.credentials() {
        Some(credentials) => {
            println!("session: {}", credentials.session_id);
            match credentials.time_until_expiry() {
                Some(left) if left.num_seconds() > 0 => {
                    println!("token expires in {} minutes", left.num_minutes())
                }
                Some(_) => {
                    println!("token expired (the server decides whether it is still accepted)")
                }
                None => println!("token expiry unknown"),
            }
        }
        None => println!("not logged in"),
    }
}

async fn run(args: &[String]) -> Result<()> {
    let Some(command) = args.first() else {
        eprint!("{}", USAGE);
        return Ok(());
    };

    let mut config = ClientConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        ClientConfig::default()
    });
    config.apply_env();

    let store = credential_store()?;
    if command == "status" || command == "logout" {
        let session = Session::load(store);
        if command == "logout" {
            session.clear()?;
            println!("credentials removed");
        } else {
            print_status(&session);
        }
        return Ok(());
    }

    let client = ApiClient::builder(auth_request_from_env()?)
        .config(config)
        .store(store)
        .build()?;

    let response = match (command.as_str(), &args[1..]) {
        ("ping", []) => client.auth().ping().await?,
        ("config", []) => client.remote_config().get().await?,
        ("event", [name, rest @ ..]) if rest.len() <= 1 => {
            let meta = rest.first().map(|raw| parse_object(raw)).transpose()?;
            let batch = EventBatch::from(vec![Event {
                timestamp: now(),
                name: name.clone(),
                meta,
            }]);
            client.collect().event(&batch).await?
        }
        ("log", [level, text @ ..]) if !text.is_empty() => {
            let batch = LogBatch::from(vec![LogEntry {
                timestamp: now(),
                log_level: Some(level.clone()),
                text: Some(text.join(" ")),
                meta: None,
            }]);
            client.collect().log(&batch).await?
        }
        ("telemetry", [name, data]) => {
            let batch = TelemetryBatch::from(vec![TelemetryEntry {
                timestamp: now(),
                name: name.clone(),
                data: parse_object(data)?,
            }]);
            client.collect().telemetry(&batch).await?
        }
        ("prompt", words) if !words.is_empty() => {
            client.services().llm(&Prompt::new(words.join(" "))).await?
        }
        _ => {
            eprint!("{}", USAGE);
            bail!("Unrecognized command line");
        }
    };

    print_response(&response)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    info!("ixrlib starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    run(&args).await
}
