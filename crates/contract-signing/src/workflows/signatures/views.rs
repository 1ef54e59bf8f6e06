//! Request and response payloads exposed by the signature workflow.
//!
//! Field names are camelCase on the wire so existing signing front-ends keep working.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Contract, ContractFormat, ContractId, ContractSignatureStatus, ContractType, SignatureRecord,
    SignatureStatus, SignatureToken, SignerType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateSignatureRequest {
    pub client_email: String,
    pub agent_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedTokens {
    pub client: SignatureToken,
    pub agent: SignatureToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiateSignatureResponse {
    pub message: String,
    pub tokens: IssuedTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignContractRequest {
    pub token: SignatureToken,
    /// Encoded signature image (typically a base64 data URL).
    pub signature_image: String,
    pub document_verification: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignContractResponse {
    pub message: String,
    pub contract_status: ContractSignatureStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResendInvitationResponse {
    pub message: String,
}

/// What a signing page needs to render; other parties' documents and contact
/// details stay out of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSummary {
    pub id: ContractId,
    pub contract_number: u32,
    pub contract_type: ContractType,
    pub amount: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub client_name: String,
    pub agent_name: String,
    pub content: String,
    pub format: ContractFormat,
    pub signature_status: ContractSignatureStatus,
}

impl From<&Contract> for ContractSummary {
    fn from(contract: &Contract) -> Self {
        Self {
            id: contract.id.clone(),
            contract_number: contract.contract_number,
            contract_type: contract.contract_type,
            amount: contract.formatted_amount(),
            start_date: contract.start_date,
            end_date: contract.end_date,
            client_name: contract.client.name.clone(),
            agent_name: contract.agent.name.clone(),
            content: contract.content.clone(),
            format: contract.format,
            signature_status: contract.signature_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerInfo {
    pub signer_type: SignerType,
    pub signer_name: String,
    pub signer_document: String,
}

impl From<&SignatureRecord> for SignerInfo {
    fn from(record: &SignatureRecord) -> Self {
        Self {
            signer_type: record.signer_type,
            signer_name: record.signer_name.clone(),
            signer_document: record.signer_document.clone(),
        }
    }
}

/// Outcome of presenting a token. Problems with the token are reported in-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenVerification {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_info: Option<SignerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerSummary {
    pub signer_type: SignerType,
    pub signer_name: String,
    pub status: SignatureStatus,
    pub signed_at: Option<DateTime<Utc>>,
}

impl From<&SignatureRecord> for SignerSummary {
    fn from(record: &SignatureRecord) -> Self {
        Self {
            signer_type: record.signer_type,
            signer_name: record.signer_name.clone(),
            status: record.status,
            signed_at: record.signed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatusView {
    pub signature_status: ContractSignatureStatus,
    pub signatures: Vec<SignerSummary>,
    pub is_fully_signed: bool,
    pub signature_started_at: Option<DateTime<Utc>>,
}
