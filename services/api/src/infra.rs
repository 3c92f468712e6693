use el_correo::config::AppConfig;
use el_correo::error::AppError;
use el_correo::identity::{PasswordConfig, PasswordHasher};
use el_correo::store::SeaOrmStore;
use el_correo::web::AppContext;
use metrics_exporter_prometheus::PrometheusHandle;
use secrecy::ExposeSecret;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Password hasher peppered with the configured secret key.
pub(crate) fn password_hasher(config: &AppConfig) -> Arc<PasswordHasher> {
    Arc::new(PasswordHasher::new(
        config.security.secret_key.clone(),
        PasswordConfig::default(),
    ))
}

/// Connect to the configured database and bring its schema up to date.
pub(crate) async fn open_store(config: &AppConfig) -> Result<Arc<SeaOrmStore>, AppError> {
    let target = config.database.target();
    info!(%target, "connecting to database");
    let store = SeaOrmStore::connect(config.database.connection_url().expose_secret()).await?;
    Ok(Arc::new(store))
}

pub(crate) fn build_context(
    config: &AppConfig,
    store: Arc<SeaOrmStore>,
) -> Arc<AppContext<SeaOrmStore>> {
    Arc::new(AppContext::with_session_ttl(
        store,
        password_hasher(config),
        config.security.session_ttl(),
    ))
}
