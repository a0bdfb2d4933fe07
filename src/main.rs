//! Console Gateway - trusted-proxy authentication gateway
//!
//! Fronts the admin console's studio service: terminates end-user JWTs,
//! enforces RBAC per route, rate-limits sensitive endpoints, manages invite
//! tokens, and forwards authorized requests with trusted identity headers.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

use console_gateway::{
    api, config::LogFormat, config::LogTarget, db, services::Mailer, services::SmtpMailer,
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Console Gateway {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("Console Gateway starting up");

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let mailer: Option<Arc<dyn Mailer>> = match config.email {
        Some(ref email_config) => {
            info!("Initializing SMTP mailer: {}", email_config.smtp_host);
            Some(Arc::new(
                SmtpMailer::new(email_config).context("Failed to initialize SMTP mailer")?,
            ))
        }
        None => {
            warn!("Email not configured; invites will be created without sending mail");
            None
        }
    };

    info!(
        identity_url = %config.identity.url,
        studio_url = %config.studio.url,
        "Initializing gateway state"
    );
    let state = AppState::new(config.clone(), db, mailer)?;

    // Periodic expired-entry eviction for the RBAC cache
    state.rbac.spawn_eviction(config.cache.sweep_interval_secs);

    let app = api::router(state).layer(create_cors_layer()).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server is ready to accept connections");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server error")?;

    Ok(())
}

/// CORS is permissive here; the gateway sits behind the console's ingress
/// and real origin policy is enforced there.
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match log_config.target {
        LogTarget::Console => {
            let registry = tracing_subscriber::registry().with(env_filter);
            match log_config.format {
                LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
                LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
            }
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let registry = tracing_subscriber::registry().with(env_filter);
            match log_config.format {
                LogFormat::Json => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
                LogFormat::Text => registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
            }
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let registry = tracing_subscriber::registry().with(env_filter);
            match log_config.format {
                LogFormat::Json => registry
                    .with(tracing_subscriber::fmt::layer().json())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
                LogFormat::Text => registry
                    .with(tracing_subscriber::fmt::layer())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(writer),
                    )
                    .init(),
            }
            Some(guard)
        }
    }
}

/// Create a non-blocking daily-rotating file writer
fn create_file_writer(
    log_config: &console_gateway::config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let appender = tracing_appender::rolling::daily(&log_config.log_dir, "console-gateway.log");
    tracing_appender::non_blocking(appender)
}

/// Print help message
fn print_help() {
    println!(
        r#"Console Gateway {}

USAGE:
    console-gateway [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    GATEWAY_CONFIG      Path to configuration file (default: config.yaml)
    GATEWAY_HOST        Override server.host
    GATEWAY_PORT        Override server.port
    DATABASE_URL        Override database.url
    IDENTITY_URL        Override identity.url
    STUDIO_URL          Override studio.url
    PROXY_SECRET        Override studio.proxy_secret

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by GATEWAY_CONFIG environment variable
    2. ./config.yaml
    3. /etc/console-gateway/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
