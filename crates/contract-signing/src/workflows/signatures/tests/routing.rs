use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use axum::Json;
use chrono::Duration;
use serde_json::json;
use tower::ServiceExt;

use crate::workflows::signatures::domain::{SignatureStatus, SignerType};
use crate::workflows::signatures::router::{sign_handler, verify_handler};

#[tokio::test]
async fn initiate_route_returns_created_with_tokens() {
    let h = harness();

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/contracts/ctr-1/initiate-signatures")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({
                        "clientEmail": CLIENT_EMAIL,
                        "agentEmail": AGENT_EMAIL,
                    }))
                    .expect("serialize request"),
                ))
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let client = payload["tokens"]["client"].as_str().expect("client token");
    assert!(client.starts_with("sign_"));
    assert_eq!(h.stored_record(SignerType::Client).token.as_str(), client);
}

#[tokio::test]
async fn initiate_route_reports_missing_contract() {
    let h = harness();

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/contracts/nope/initiate-signatures")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&initiate_request()).expect("serialize request"),
                ))
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "contract not found");
}

#[tokio::test]
async fn second_initiation_is_a_bad_request() {
    let h = harness();
    h.initiate();

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/contracts/ctr-1/initiate-signatures")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&initiate_request()).expect("serialize request"),
                ))
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verify_route_returns_signer_info_in_camel_case() {
    let h = harness();
    let tokens = h.initiate().tokens;

    let response = h
        .router()
        .oneshot(
            Request::get(format!("/api/v1/signature/verify/{}", tokens.client))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["isValid"], true);
    assert_eq!(payload["signerInfo"]["signerType"], "CLIENT");
    assert_eq!(payload["signerInfo"]["signerDocument"], CLIENT_DOCUMENT);
    assert_eq!(payload["contract"]["contractNumber"], 1042);
    assert!(payload.get("errorMessage").is_none());
}

#[tokio::test]
async fn verify_handler_rejects_expired_token_with_reason() {
    let h = harness();
    let tokens = h.initiate().tokens;
    h.clock.advance(Duration::days(9));

    let response = verify_handler(State(h.service.clone()), Path(tokens.agent.0.clone())).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert_eq!(payload["isValid"], false);
    assert_eq!(payload["errorMessage"], "token expired");
    assert_eq!(
        h.stored_record(SignerType::Agent).status,
        SignatureStatus::Expired
    );
}

#[tokio::test]
async fn sign_handler_fills_client_details_from_headers() {
    let h = harness();
    let tokens = h.initiate().tokens;

    let mut request = sign_request(&tokens.client, CLIENT_DOCUMENT);
    request.ip_address = None;
    request.user_agent = None;

    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_static("203.0.113.50, 10.1.1.1"),
    );
    headers.insert(header::USER_AGENT, HeaderValue::from_static("SignPad/2.1"));

    let response = sign_handler(State(h.service.clone()), headers, Json(request)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["contractStatus"], "PARTIALLY_SIGNED");

    let record = h.stored_record(SignerType::Client);
    assert_eq!(record.ip_address.as_deref(), Some("203.0.113.50"));
    assert_eq!(record.user_agent.as_deref(), Some("SignPad/2.1"));
}

#[tokio::test]
async fn sign_route_maps_document_mismatch_to_forbidden() {
    let h = harness();
    let tokens = h.initiate().tokens;

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/signature/sign")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&sign_request(&tokens.agent, "CI-0000000"))
                        .expect("serialize request"),
                ))
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        h.stored_record(SignerType::Agent).status,
        SignatureStatus::Pending
    );
}

#[tokio::test]
async fn sign_route_rejects_empty_signature_image() {
    let h = harness();
    let tokens = h.initiate().tokens;
    let mut request = sign_request(&tokens.client, CLIENT_DOCUMENT);
    request.signature_image = String::new();

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/signature/sign")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&request).expect("serialize request"),
                ))
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_route_reports_full_signature() {
    let h = harness();
    let tokens = h.initiate().tokens;
    h.service
        .sign(sign_request(&tokens.client, CLIENT_DOCUMENT))
        .expect("client signs");
    h.service
        .sign(sign_request(&tokens.agent, AGENT_DOCUMENT))
        .expect("agent signs");

    let response = h
        .router()
        .oneshot(
            Request::get("/api/v1/contracts/ctr-1/signature-status")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["signatureStatus"], "FULLY_SIGNED");
    assert_eq!(payload["isFullySigned"], true);
    assert_eq!(payload["signatures"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn resend_route_accepts_lowercase_signer_type() {
    let h = harness();
    h.initiate();

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/contracts/ctr-1/resend-invitation/client")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.notifier.sent().len(), 3);
}

#[tokio::test]
async fn resend_route_rejects_unknown_signer_type() {
    let h = harness();
    h.initiate();

    let response = h
        .router()
        .oneshot(
            Request::post("/api/v1/contracts/ctr-1/resend-invitation/notary")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("notary"));
}
