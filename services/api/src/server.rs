use crate::cli::ServeArgs;
use crate::infra::{build_context, open_store, password_hasher, AppState};
use crate::routes::with_operational_routes;
use crate::seed::seed_store;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use el_correo::config::AppConfig;
use el_correo::error::AppError;
use el_correo::seed::{SeedOptions, Seeder};
use el_correo::{telemetry, web};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = open_store(&config).await?;
    if config.seed_demo {
        let seeder = Seeder::new(store.clone(), password_hasher(&config));
        let reports = seed_store(&seeder, &SeedOptions::default()).await?;
        info!(routines = reports.len(), "demo data seeded");
    }

    let context = build_context(&config, store);
    let app = with_operational_routes(web::router(context))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "human-resources records service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
