use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::error::signature_status_code;

use super::domain::{ContractId, SignatureToken, SignerType};
use super::repository::{ContractRepository, Notifier, SignatureRepository};
use super::service::{ContractSignatureService, SignatureServiceError};
use super::views::{InitiateSignatureRequest, SignContractRequest};

const UNKNOWN_CLIENT: &str = "Unknown";

/// Router builder exposing the signature workflow over HTTP.
pub fn signature_router<C, S, N>(service: Arc<ContractSignatureService<C, S, N>>) -> Router
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/contracts/:contract_id/initiate-signatures",
            post(initiate_handler::<C, S, N>),
        )
        .route(
            "/api/v1/contracts/:contract_id/signature-status",
            get(status_handler::<C, S, N>),
        )
        .route(
            "/api/v1/contracts/:contract_id/resend-invitation/:signer_type",
            post(resend_handler::<C, S, N>),
        )
        .route(
            "/api/v1/signature/verify/:token",
            get(verify_handler::<C, S, N>),
        )
        .route("/api/v1/signature/sign", post(sign_handler::<C, S, N>))
        .with_state(service)
}

pub(crate) async fn initiate_handler<C, S, N>(
    State(service): State<Arc<ContractSignatureService<C, S, N>>>,
    Path(contract_id): Path<String>,
    Json(request): Json<InitiateSignatureRequest>,
) -> Response
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    match service.initiate(&ContractId(contract_id), request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn status_handler<C, S, N>(
    State(service): State<Arc<ContractSignatureService<C, S, N>>>,
    Path(contract_id): Path<String>,
) -> Response
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    match service.status(&ContractId(contract_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn resend_handler<C, S, N>(
    State(service): State<Arc<ContractSignatureService<C, S, N>>>,
    Path((contract_id, signer_type)): Path<(String, String)>,
) -> Response
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    let signer_type = match signer_type.parse::<SignerType>() {
        Ok(signer_type) => signer_type,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    match service.resend_invitation(&ContractId(contract_id), signer_type) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn verify_handler<C, S, N>(
    State(service): State<Arc<ContractSignatureService<C, S, N>>>,
    Path(token): Path<String>,
) -> Response
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    match service.verify_token(&SignatureToken(token)) {
        Ok(verification) if verification.is_valid => {
            (StatusCode::OK, Json(verification)).into_response()
        }
        Ok(verification) => (StatusCode::BAD_REQUEST, Json(verification)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Missing client details are filled from the request headers before signing.
pub(crate) async fn sign_handler<C, S, N>(
    State(service): State<Arc<ContractSignatureService<C, S, N>>>,
    headers: HeaderMap,
    Json(mut request): Json<SignContractRequest>,
) -> Response
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    if request.ip_address.is_none() {
        request.ip_address = Some(client_ip(&headers));
    }
    if request.user_agent.is_none() {
        request.user_agent = Some(
            header_value(&headers, header::USER_AGENT.as_str())
                .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        );
    }

    match service.sign(request) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: SignatureServiceError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (signature_status_code(&err), Json(payload)).into_response()
}

fn client_ip(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|value| {
            value
                .split(',')
                .next()
                .map(str::trim)
                .filter(|first| !first.is_empty())
                .map(str::to_string)
        })
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
