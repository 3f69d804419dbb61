//! # Acuity Webhooks CLI
//!
//! Command-line tool for checking captured Acuity static webhook
//! deliveries against a secret.
//!
//! This module provides CLI commands for:
//! - Verifying the signature of a delivery
//! - Decoding a delivery body into its event
//! - Running a delivery through the full handler pipeline

use acuity_webhooks::{
    decode_event, decode_text, DecodedEvent, StaticWebhookConfig, StaticWebhookHandler,
    WebhookError, WebhookRequest,
};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Structure
// ============================================================================

/// Acuity Webhooks CLI - check static webhook deliveries
#[derive(Debug, Parser)]
#[command(name = "acuity-webhooks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Verify and decode Acuity Scheduling static webhook deliveries")]
pub struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "ACUITY_WEBHOOKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level or filter directive (overrides RUST_LOG)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check the signature of a captured delivery
    Verify(DeliveryArgs),

    /// Decode a delivery body without checking its signature
    Decode {
        /// File holding the raw body, or `-` for stdin
        #[arg(short, long)]
        body: PathBuf,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Verify, decode and print a delivery as JSON
    Handle {
        #[command(flatten)]
        delivery: DeliveryArgs,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },
}

/// Arguments describing one captured delivery.
#[derive(Debug, Clone, Args)]
pub struct DeliveryArgs {
    /// File holding the raw body, or `-` for stdin
    #[arg(short, long)]
    pub body: PathBuf,

    /// Signature extracted from the request
    #[arg(short, long)]
    pub signature: Option<String>,

    /// Request header as `Name: value`; may be repeated
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Shared secret (the Acuity API key)
    #[arg(long, env = "ACUITY_WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Signature header name
    #[arg(long)]
    pub header_name: Option<String>,

    /// Accept deliveries without checking their signature
    #[arg(long)]
    pub no_verify: bool,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Webhook rejected ({code}): {0}", code = .0.code())]
    Webhook(#[from] WebhookError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Logging setup failed: {message}")]
    Logging { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Logging { .. } => 1,
            Self::Webhook(_) => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Io(_) => 5,
            Self::Serialization(_) => 6,
        }
    }
}

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid webhook settings: {0}")]
    Webhook(#[from] WebhookError),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Prefix for environment overrides, e.g. `ACUITY_WEBHOOKS__WEBHOOK__SECRET`.
pub const ENV_PREFIX: &str = "ACUITY_WEBHOOKS";

/// CLI configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Handler settings
    #[serde(default)]
    pub webhook: StaticWebhookConfig,

    /// Default logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum LogFormat {
    #[default]
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "json")]
    Json,
}

/// Load configuration from defaults, an optional file, and the environment.
pub fn load_configuration(config_path: Option<&Path>) -> Result<CliConfig, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = config_path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        builder = builder.add_source(
            config::File::from(path).format(config::FileFormat::Toml),
        );
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    Ok(builder.build()?.try_deserialize()?)
}

/// Apply command-line overrides on top of the loaded handler settings.
pub fn resolve_webhook_config(base: &StaticWebhookConfig, args: &DeliveryArgs) -> StaticWebhookConfig {
    let mut config = base.clone();
    if let Some(secret) = &args.secret {
        config.secret = Some(secret.clone());
    }
    if let Some(header_name) = &args.header_name {
        config.header_name = Some(header_name.clone());
    }
    if args.no_verify {
        config.verify = false;
    }
    config
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_configuration(cli.config.as_deref())?;

    // Initialize logging
    initialize_logging(&cli, &config.logging)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &config, &mut out).await
}

/// Execute a parsed command, writing results to `out`.
pub async fn execute(
    command: Commands,
    config: &CliConfig,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Commands::Verify(delivery) => execute_verify_command(&delivery, config, out),
        Commands::Decode { body, pretty } => execute_decode_command(&body, pretty, out),
        Commands::Handle { delivery, pretty } => {
            execute_handle_command(&delivery, pretty, config, out).await
        }
    }
}

/// Initialize logging based on CLI arguments and configuration.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn initialize_logging(cli: &Cli, logging: &LoggingConfig) -> Result<(), CliError> {
    let filter = match (&cli.log_level, std::env::var(EnvFilter::DEFAULT_ENV)) {
        (Some(level), _) => EnvFilter::try_new(level),
        (None, Ok(directives)) => EnvFilter::try_new(directives),
        (None, Err(_)) => EnvFilter::try_new(logging.level.as_deref().unwrap_or("warn")),
    }
    .map_err(|e| CliError::InvalidArgument {
        arg: "log-level".to_string(),
        message: e.to_string(),
    })?;

    let json = cli.json_logs || logging.format == LogFormat::Json;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Execute verify command
fn execute_verify_command(
    delivery: &DeliveryArgs,
    config: &CliConfig,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let webhook_config = resolve_webhook_config(&config.webhook, delivery);
    let handler = StaticWebhookHandler::new(webhook_config).map_err(ConfigError::from)?;
    let body = read_body(&delivery.body)?;
    let headers = parse_headers(&delivery.headers)?;

    info!(
        body_len = body.len(),
        header_count = headers.len(),
        header_name = %handler.header_name(),
        "Verifying webhook signature"
    );

    let request = build_request(body, &headers, delivery.signature.as_deref());
    match handler.verify_request(&request) {
        Ok(()) => {
            writeln!(out, "valid")?;
            Ok(())
        }
        Err(e) => {
            writeln!(out, "invalid")?;
            Err(e.into())
        }
    }
}

/// Execute decode command
fn execute_decode_command(body: &Path, pretty: bool, out: &mut dyn Write) -> Result<(), CliError> {
    let body = read_body(body)?;
    debug!(body_len = body.len(), "Decoding webhook body");

    let event = decode_event(&decode_text(&body))?;
    write_event(out, &event, pretty)
}

/// Execute handle command
async fn execute_handle_command(
    delivery: &DeliveryArgs,
    pretty: bool,
    config: &CliConfig,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let webhook_config = resolve_webhook_config(&config.webhook, delivery);
    let handler = StaticWebhookHandler::new(webhook_config).map_err(ConfigError::from)?;
    let body = read_body(&delivery.body)?;
    let headers = parse_headers(&delivery.headers)?;

    let request = build_request(body, &headers, delivery.signature.as_deref());
    let event = handler
        .handle_with(request, |event| async move { write_event(out, &event, pretty) })
        .await?;

    info!(
        event_type = %event.event_type,
        appointment_id = event.id,
        "Webhook handled"
    );
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn build_request<'a>(
    body: Vec<u8>,
    headers: &'a HashMap<String, Vec<String>>,
    signature: Option<&'a str>,
) -> WebhookRequest<'a> {
    let request = WebhookRequest::new(body).with_headers(headers);
    match signature {
        Some(signature) => request.with_signature(signature),
        None => request,
    }
}

/// Read the raw body from a file, or stdin for `-`.
pub fn read_body(path: &Path) -> Result<Vec<u8>, CliError> {
    if path == Path::new("-") {
        let mut body = Vec::new();
        std::io::stdin().lock().read_to_end(&mut body)?;
        Ok(body)
    } else {
        Ok(std::fs::read(path)?)
    }
}

/// Parse repeated `Name: value` header arguments.
///
/// Names are folded to lowercase so repeats in any casing collect under one
/// key, in the order given.
pub fn parse_headers(raw: &[String]) -> Result<HashMap<String, Vec<String>>, CliError> {
    let mut headers: HashMap<String, Vec<String>> = HashMap::new();

    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .ok_or_else(|| CliError::InvalidArgument {
                arg: "header".to_string(),
                message: format!("expected `Name: value`, got `{}`", entry),
            })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(CliError::InvalidArgument {
                arg: "header".to_string(),
                message: format!("header name cannot be empty in `{}`", entry),
            });
        }

        headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.trim().to_string());
    }

    Ok(headers)
}

fn write_event(out: &mut dyn Write, event: &DecodedEvent, pretty: bool) -> Result<(), CliError> {
    let json = if pretty {
        serde_json::to_string_pretty(event)?
    } else {
        serde_json::to_string(event)?
    };
    writeln!(out, "{}", json)?;
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
