// Main entry point for the security server

use anyhow::Context;
use security_server::api::{create_admin_router, create_proxy_router, AppState};
use security_server::auth::audit_logger::AuditLogger;
use security_server::auth::auth_middleware::AuthState;
use security_server::auth::authority::GrantedAuthorityGate;
use security_server::config::Config;
use security_server::loader::principal_loader::PrincipalLoader;
use security_server::loader::serverconf_loader::ServerConfLoader;
use security_server::metrics::Metrics;
use security_server::proxy::precondition::AuthPrecondition;
use security_server::proxy::{ClientProxy, ClientProxyHandler, ClientRestMessageHandler, HttpRestForwarder};
use security_server::services::client_service::ClientService;
use security_server::services::endpoint_service::EndpointService;
use security_server::services::service_description_service::ServiceDescriptionService;
use security_server::state::global_conf::FileGlobalConf;
use security_server::state::key_conf::FileKeyConf;
use security_server::state::reloader::ConfReloader;
use security_server::state::store::ServerConfStore;
use security_server::wsdl::{
    CommandWsdlValidator, DefaultWsdlUrlValidator, HttpWsdlFetcher, NoopWsdlValidator, WsdlValidator,
};

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Configuration comes first, before any logging
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Tracing can only be initialized once
    init_tracing(&config)?;

    info!(
        bind_address = %config.bind_address,
        admin_port = config.admin_port,
        proxy_port = config.proxy_port,
        ssl_enabled = config.ssl_enabled,
        "Starting security server"
    );

    // 3. Server configuration store
    let serverconf = ServerConfLoader::from_file(&config.serverconf_path)
        .with_context(|| format!("loading {}", config.serverconf_path.display()))?;
    info!(clients = serverconf.clients.len(), "Server configuration loaded");

    let mut store = ServerConfStore::new(serverconf);
    if config.serverconf_write_back {
        store = store.with_write_back(config.serverconf_path.clone());
    }
    let store = Arc::new(store);

    // 4. Global configuration and key configuration
    let global_conf = Arc::new(
        FileGlobalConf::load(&config.globalconf_path)
            .with_context(|| format!("loading {}", config.globalconf_path.display()))?,
    );
    let key_conf = Arc::new(
        FileKeyConf::load(
            config.auth_cert_chain_path.clone(),
            config.auth_private_key_path.clone(),
        )
        .context("loading authentication key")?,
    );

    // 5. Admin principals
    let principals = Arc::new(
        PrincipalLoader::from_file(&config.api_keys_path)
            .with_context(|| format!("loading {}", config.api_keys_path.display()))?,
    );
    info!(principals = principals.len(), "Admin principals loaded");

    let audit_logger = Arc::new(AuditLogger::new());
    let metrics = Arc::new(Metrics::new()?);

    // 6. Services
    let fetcher = Arc::new(HttpWsdlFetcher::new(Duration::from_secs(
        config.wsdl_fetch_timeout_secs,
    ))?);
    let validator: Arc<dyn WsdlValidator> = match &config.wsdl_validator_command {
        Some(command) => Arc::new(CommandWsdlValidator::new(command.clone())),
        None => Arc::new(NoopWsdlValidator),
    };
    let service_descriptions = Arc::new(ServiceDescriptionService::new(
        store.clone(),
        fetcher,
        Arc::new(DefaultWsdlUrlValidator),
        validator,
    ));

    let config = Arc::new(config);
    let app_state = AppState {
        store: store.clone(),
        service_descriptions,
        endpoints: Arc::new(EndpointService::new(store.clone())),
        clients: Arc::new(ClientService::new(store.clone())),
        gate: Arc::new(GrantedAuthorityGate::new(audit_logger.clone())),
        global_conf: global_conf.clone(),
        audit_logger: audit_logger.clone(),
        metrics: metrics.clone(),
        config: config.clone(),
    };
    let auth_state = Arc::new(AuthState {
        principals,
        audit_logger,
    });

    // 7. Client proxy handler chain; the REST handler is last
    let forwarder = Arc::new(HttpRestForwarder::new(
        &config.server_proxy_url,
        config.proxy_timeout_secs,
    )?);
    let rest_handler: Arc<dyn ClientProxyHandler> = Arc::new(ClientRestMessageHandler::new(
        AuthPrecondition::new(global_conf.clone(), key_conf.clone(), config.ssl_enabled),
        forwarder,
        config.body_size_limit_bytes,
        metrics,
    ));
    let client_proxy = Arc::new(ClientProxy::new(vec![rest_handler]));

    // 8. Background reload of global conf and key conf
    let reloader = ConfReloader::new(
        global_conf,
        key_conf,
        Duration::from_secs(config.conf_reload_interval_secs),
    )
    .spawn();

    // 9. Listeners
    let admin_addr = format!("{}:{}", config.bind_address, config.admin_port);
    let proxy_addr = format!("{}:{}", config.bind_address, config.proxy_port);
    let admin_listener = tokio::net::TcpListener::bind(&admin_addr)
        .await
        .with_context(|| format!("binding admin listener to {}", admin_addr))?;
    let proxy_listener = tokio::net::TcpListener::bind(&proxy_addr)
        .await
        .with_context(|| format!("binding proxy listener to {}", proxy_addr))?;

    info!(addr = %admin_addr, "Admin API listening");
    info!(addr = %proxy_addr, "Client proxy listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let admin_server = axum::serve(
        admin_listener,
        create_admin_router(app_state, auth_state).into_make_service(),
    )
    .with_graceful_shutdown(wait_for(shutdown_rx.clone()))
    .into_future();
    let proxy_server = axum::serve(
        proxy_listener,
        create_proxy_router(client_proxy, &config).into_make_service(),
    )
    .with_graceful_shutdown(wait_for(shutdown_rx))
    .into_future();

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let (admin_result, proxy_result) = tokio::join!(admin_server, proxy_server);
    reloader.abort();

    if let Err(e) = &admin_result {
        error!(error = %e, "Admin server error");
    }
    if let Err(e) = &proxy_result {
        error!(error = %e, "Proxy server error");
    }
    admin_result?;
    proxy_result?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
