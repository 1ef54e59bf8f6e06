use crate::infra::{AppState, ContractDraft, InMemoryContractRepository};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use contract_signing::error::signature_status_code;
use contract_signing::workflows::signatures::{
    signature_router, AgentParty, ClientParty, ContractFormat, ContractId, ContractRepository,
    ContractSignatureService, ContractType, Notifier, RepositoryError, SignatureRepository,
    SignatureServiceError,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContractIntakeRequest {
    pub(crate) contract_type: ContractType,
    pub(crate) amount_cents: u64,
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
    pub(crate) client: ClientParty,
    pub(crate) agent: AgentParty,
    pub(crate) content: String,
    pub(crate) format: ContractFormat,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

impl ContractIntakeRequest {
    fn validate(self) -> Result<ContractDraft, String> {
        let required = [
            ("client.name", self.client.name.as_str()),
            ("client.document", self.client.document.as_str()),
            ("agent.name", self.agent.name.as_str()),
            ("agent.document", self.agent.document.as_str()),
            ("content", self.content.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("{field} must not be empty"));
        }
        if self.end_date < self.start_date {
            return Err("endDate must not precede startDate".to_string());
        }

        Ok(ContractDraft {
            contract_type: self.contract_type,
            amount_cents: self.amount_cents,
            start_date: self.start_date,
            end_date: self.end_date,
            client: self.client,
            agent: self.agent,
            content: self.content,
            format: self.format,
            notes: self.notes.filter(|notes| !notes.trim().is_empty()),
        })
    }
}

/// Service surface: the signature workflow, contract intake, and operational endpoints.
pub(crate) fn with_signature_routes<S, N>(
    contracts: Arc<InMemoryContractRepository>,
    service: Arc<ContractSignatureService<InMemoryContractRepository, S, N>>,
) -> Router
where
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    let intake = Router::new()
        .route("/api/v1/contracts", axum::routing::post(register_contract))
        .route("/api/v1/contracts/:contract_id", get(fetch_contract))
        .with_state(contracts);

    signature_router(service)
        .merge(intake)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn register_contract(
    State(contracts): State<Arc<InMemoryContractRepository>>,
    Json(request): Json<ContractIntakeRequest>,
) -> Response {
    let draft = match request.validate() {
        Ok(draft) => draft,
        Err(message) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": message })),
            )
                .into_response()
        }
    };

    match contracts.register(draft) {
        Ok(contract) => {
            tracing::info!(
                contract_id = %contract.id.0,
                contract_number = contract.contract_number,
                "contract registered"
            );
            (StatusCode::CREATED, Json(contract)).into_response()
        }
        Err(err) => repository_error(err),
    }
}

pub(crate) async fn fetch_contract(
    State(contracts): State<Arc<InMemoryContractRepository>>,
    Path(contract_id): Path<String>,
) -> Response {
    match contracts.fetch(&ContractId(contract_id)) {
        Ok(Some(contract)) => (StatusCode::OK, Json(contract)).into_response(),
        Ok(None) => repository_error(RepositoryError::NotFound),
        Err(err) => repository_error(err),
    }
}

fn repository_error(err: RepositoryError) -> Response {
    let err = match err {
        RepositoryError::NotFound => SignatureServiceError::ContractNotFound,
        other => SignatureServiceError::Repository(other),
    };
    let payload = json!({ "error": err.to_string() });
    (signature_status_code(&err), Json(payload)).into_response()
}
