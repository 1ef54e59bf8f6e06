use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for contracts owned by the external contract collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(pub String);

/// Identifier wrapper for per-signer signature records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureId(pub String);

/// Opaque, URL-safe credential handed to exactly one signer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureToken(pub String);

impl SignatureToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    Purchase,
    Sale,
    Anticretic,
}

impl ContractType {
    pub const fn label(self) -> &'static str {
        match self {
            ContractType::Purchase => "PURCHASE",
            ContractType::Sale => "SALE",
            ContractType::Anticretic => "ANTICRETIC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    Active,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractFormat {
    Pdf,
    Html,
}

/// Contract-level summary of every signer's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractSignatureStatus {
    NoRequired,
    PendingSignatures,
    PartiallySigned,
    FullySigned,
    /// Reserved: expiry is only observed per token, nothing drives a contract here.
    SignatureExpired,
}

impl ContractSignatureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContractSignatureStatus::NoRequired => "NO_REQUIRED",
            ContractSignatureStatus::PendingSignatures => "PENDING_SIGNATURES",
            ContractSignatureStatus::PartiallySigned => "PARTIALLY_SIGNED",
            ContractSignatureStatus::FullySigned => "FULLY_SIGNED",
            ContractSignatureStatus::SignatureExpired => "SIGNATURE_EXPIRED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ContractSignatureStatus::FullySigned | ContractSignatureStatus::SignatureExpired
        )
    }
}

impl fmt::Display for ContractSignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignerType {
    Client,
    Agent,
}

impl SignerType {
    pub const ALL: [SignerType; 2] = [SignerType::Client, SignerType::Agent];

    pub const fn label(self) -> &'static str {
        match self {
            SignerType::Client => "CLIENT",
            SignerType::Agent => "AGENT",
        }
    }
}

impl fmt::Display for SignerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signer type '{0}' (expected CLIENT or AGENT)")]
pub struct UnknownSignerType(pub String);

impl FromStr for SignerType {
    type Err = UnknownSignerType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CLIENT" => Ok(SignerType::Client),
            "AGENT" => Ok(SignerType::Agent),
            _ => Err(UnknownSignerType(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Expired,
}

impl SignatureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SignatureStatus::Pending => "PENDING",
            SignatureStatus::Signed => "SIGNED",
            SignatureStatus::Expired => "EXPIRED",
        }
    }
}

/// Party details captured on the contract when it was drafted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientParty {
    pub name: String,
    pub document: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentParty {
    pub name: String,
    pub document: String,
}

/// Negotiated agreement over a property, plus the signature aggregate it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub contract_number: u32,
    pub contract_type: ContractType,
    pub status: ContractStatus,
    /// Two decimal places, stored in minor units.
    pub amount_cents: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub client: ClientParty,
    pub agent: AgentParty,
    pub content: String,
    pub format: ContractFormat,
    #[serde(default)]
    pub notes: Option<String>,
    pub signature_status: ContractSignatureStatus,
    #[serde(default)]
    pub signature_started_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn signer_identity(&self, signer_type: SignerType) -> (&str, &str) {
        match signer_type {
            SignerType::Client => (&self.client.name, &self.client.document),
            SignerType::Agent => (&self.agent.name, &self.agent.document),
        }
    }

    pub fn formatted_amount(&self) -> String {
        format!("${}.{:02}", self.amount_cents / 100, self.amount_cents % 100)
    }
}

/// One signer's participation in one contract's signing process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub id: SignatureId,
    pub contract_id: ContractId,
    pub signer_type: SignerType,
    pub signer_name: String,
    pub signer_document: String,
    pub signature_image: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub token: SignatureToken,
    pub token_expiration: DateTime<Utc>,
    pub status: SignatureStatus,
}

impl SignatureRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.token_expiration
    }
}

/// Derive the contract status from its full record set.
///
/// Always recomputed from scratch after a signing event; an empty set means no
/// process has been started.
pub fn aggregate_status(records: &[SignatureRecord]) -> ContractSignatureStatus {
    if records.is_empty() {
        return ContractSignatureStatus::NoRequired;
    }

    let signed = records
        .iter()
        .filter(|record| record.status == SignatureStatus::Signed)
        .count();

    if signed == 0 {
        ContractSignatureStatus::PendingSignatures
    } else if signed < records.len() {
        ContractSignatureStatus::PartiallySigned
    } else {
        ContractSignatureStatus::FullySigned
    }
}
