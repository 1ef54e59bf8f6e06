use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryContractRepository, InMemorySignatureRepository, OutboxNotifier,
};
use crate::routes::with_signature_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use contract_signing::config::AppConfig;
use contract_signing::error::AppError;
use contract_signing::telemetry;
use contract_signing::workflows::signatures::ContractSignatureService;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let contracts = Arc::new(InMemoryContractRepository::default());
    let signatures = Arc::new(InMemorySignatureRepository::default());
    let notifier = Arc::new(OutboxNotifier::default());
    let signature_service = Arc::new(ContractSignatureService::new(
        contracts.clone(),
        signatures,
        notifier,
        config.signing.clone(),
    ));

    let app = with_signature_routes(contracts, signature_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        token_ttl_days = config.signing.token_ttl_days,
        "contract signing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
