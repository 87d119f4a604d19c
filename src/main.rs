use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use webserver_adapter::config::resolve_config_with;
use webserver_adapter::dispatch::HandlerRegistry;
use webserver_adapter::http::HttpServer;
use webserver_adapter::lifecycle::{shutdown_signal, Shutdown};
use webserver_adapter::messaging::{NatsTransport, Transport};
use webserver_adapter::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "webserver-adapter", version, about = "HTTP façade for an OpenAPI/Swagger description")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API description (YAML or JSON); overrides `web_server.rest_api_path`.
    #[arg(short, long)]
    api: Option<PathBuf>,

    /// Listen address; overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config_with(cli.config.as_deref(), |config| {
        if let Some(api) = &cli.api {
            config.web_server.rest_api_path = api.display().to_string();
        }
        if let Some(bind) = &cli.bind {
            config.listener.bind_address = bind.clone();
        }
    })?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "webserver-adapter starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let endpoints = webserver_adapter::load_api(Path::new(&config.web_server.rest_api_path))?;

    let transport: Option<Arc<dyn Transport>> = if config.web_server.use_messaging {
        Some(Arc::new(NatsTransport::connect(&config.messaging).await?))
    } else {
        None
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.web_server.base_path,
        endpoints = endpoints.len(),
        enable_mocking = config.web_server.enable_mocking,
        use_messaging = config.web_server.use_messaging,
        ignore_api_operation_ids = config.web_server.ignore_api_operation_ids,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, endpoints, &HandlerRegistry::new(), transport)?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
