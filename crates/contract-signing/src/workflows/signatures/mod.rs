//! Contract digital-signature workflow: token issuance, expiry, two-party signing,
//! and the contract-level status derived from the signer records.

pub mod clock;
pub mod domain;
pub(crate) mod locks;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod templates;
pub mod token;
pub mod views;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock};
pub use domain::{
    aggregate_status, AgentParty, ClientParty, Contract, ContractFormat, ContractId,
    ContractSignatureStatus, ContractStatus, ContractType, SignatureId, SignatureRecord,
    SignatureStatus, SignatureToken, SignerType, UnknownSignerType,
};
pub use repository::{ContractRepository, Notifier, RepositoryError, SignatureRepository};
pub use router::signature_router;
pub use service::{ContractSignatureService, SignatureServiceError, TokenRejection};
pub use views::{
    ContractSummary, InitiateSignatureRequest, InitiateSignatureResponse, IssuedTokens,
    ResendInvitationResponse, SignContractRequest, SignContractResponse, SignatureStatusView,
    SignerInfo, SignerSummary, TokenVerification,
};
