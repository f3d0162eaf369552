use actix_cors::Cors;
use actix_web::{http::header, middleware::NormalizePath, rt, web, App, HttpServer};
use portfolio_contact_guard::{
    background_task::start_sweep_task,
    constants::SESSION_HEADER,
    graceful_shutdown::shutdown_signal,
    routes::configure_routes,
    settings::AppConfig,
    AppState,
};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_cors(config: &AppConfig) -> Cors {
    let origins = config.cors_origins();
    let cors = if origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .allowed_header(SESSION_HEADER)
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.is_production());
    tracing::info!("Loaded configuration: {:?}", config);

    let app_state = web::Data::new(AppState::new(&config));

    let server_addr = format!("{}:{}", config.host, config.port);

    tracing::info!(
        "🚀 Starting Portfolio Contact v{} on {} (store: {})",
        env!("CARGO_PKG_VERSION"),
        server_addr,
        app_state.store.backend()
    );

    rt::spawn(start_sweep_task(
        app_state.contact_handler.csrf_manager.clone(),
        app_state.contact_handler.rate_limiter.clone(),
    ));

    let server_config = config.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(build_cors(&server_config))
            .wrap(NormalizePath::trim())
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.worker_count)
    .disable_signals()
    .bind(server_addr)?
    .run();

    let handle = server.handle();

    tokio::select! {
        res = server => res,
        _ = shutdown_signal() => {
            handle.stop(true).await;
            Ok(())
        }
    }
}
