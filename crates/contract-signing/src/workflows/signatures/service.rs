use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::SigningConfig;

use super::clock::{Clock, SystemClock};
use super::domain::{
    aggregate_status, Contract, ContractId, ContractSignatureStatus, SignatureId,
    SignatureRecord, SignatureStatus, SignatureToken, SignerType,
};
use super::locks::ContractLocks;
use super::repository::{ContractRepository, Notifier, RepositoryError, SignatureRepository};
use super::templates::{self, EmailContent};
use super::token;
use super::views::{
    ContractSummary, InitiateSignatureRequest, InitiateSignatureResponse, IssuedTokens,
    ResendInvitationResponse, SignContractRequest, SignContractResponse, SignatureStatusView,
    SignerInfo, SignerSummary, TokenVerification,
};

/// Orchestrates initiation, verification, signing, and resends for contract signatures.
///
/// Holds no workflow state of its own beyond the per-contract lock table; every
/// decision is taken from what the repositories return.
pub struct ContractSignatureService<C, S, N> {
    contracts: Arc<C>,
    signatures: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: SigningConfig,
    locks: ContractLocks,
}

static SIGNATURE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_signature_id() -> SignatureId {
    let id = SIGNATURE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SignatureId(format!("sig-{id:06}"))
}

enum TokenCheck {
    Valid {
        contract: Contract,
        record: SignatureRecord,
    },
    Rejected(TokenRejection),
}

impl<C, S, N> ContractSignatureService<C, S, N>
where
    C: ContractRepository + 'static,
    S: SignatureRepository + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        contracts: Arc<C>,
        signatures: Arc<S>,
        notifier: Arc<N>,
        config: SigningConfig,
    ) -> Self {
        Self::with_clock(contracts, signatures, notifier, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        contracts: Arc<C>,
        signatures: Arc<S>,
        notifier: Arc<N>,
        config: SigningConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            contracts,
            signatures,
            notifier,
            clock,
            config,
            locks: ContractLocks::default(),
        }
    }

    /// Create one pending record per signer and invite both parties.
    pub fn initiate(
        &self,
        contract_id: &ContractId,
        request: InitiateSignatureRequest,
    ) -> Result<InitiateSignatureResponse, SignatureServiceError> {
        require("clientEmail", &request.client_email)?;
        require("agentEmail", &request.agent_email)?;

        let (contract, tokens) = self
            .locks
            .with_contract(contract_id, || -> Result<_, SignatureServiceError> {
                let mut contract = self
                    .contracts
                    .fetch(contract_id)?
                    .ok_or(SignatureServiceError::ContractNotFound)?;

                if contract.signature_status != ContractSignatureStatus::NoRequired {
                    return Err(SignatureServiceError::InvalidState {
                        current: contract.signature_status,
                    });
                }

                let now = self.clock.now();
                let expiration = self.expiration_from(now)?;
                let client = self.pending_record(&contract, SignerType::Client, now, expiration);
                let agent = self.pending_record(&contract, SignerType::Agent, now, expiration);
                let tokens = IssuedTokens {
                    client: client.token.clone(),
                    agent: agent.token.clone(),
                };

                self.signatures.save_all(vec![client, agent])?;

                contract.signature_status = ContractSignatureStatus::PendingSignatures;
                contract.signature_started_at = Some(now);
                let contract = self.contracts.save(contract)?;
                Ok((contract, tokens))
            })?;

        info!(
            contract_id = %contract.id.0,
            contract_number = contract.contract_number,
            "signature process initiated"
        );

        self.send_invitation(
            &request.client_email,
            &contract,
            &contract.client.name,
            &tokens.client,
        );
        self.send_invitation(
            &request.agent_email,
            &contract,
            &contract.agent.name,
            &tokens.agent,
        );

        Ok(InitiateSignatureResponse {
            message: "Signature process started; invitations have been sent by e-mail."
                .to_string(),
            tokens,
        })
    }

    /// Check a presented token. Token problems come back in-band; only
    /// repository failures are returned as errors.
    pub fn verify_token(
        &self,
        token: &SignatureToken,
    ) -> Result<TokenVerification, SignatureServiceError> {
        let Some(contract_id) = self.locate(token)? else {
            debug!("verification for unknown token");
            return Ok(rejected(TokenRejection::NotFound));
        };

        let check = self
            .locks
            .with_contract(&contract_id, || self.inspect_locked(token))?;

        match check {
            TokenCheck::Valid { contract, record } => Ok(TokenVerification {
                is_valid: true,
                contract: Some(ContractSummary::from(&contract)),
                signer_info: Some(SignerInfo::from(&record)),
                error_message: None,
            }),
            TokenCheck::Rejected(reason) => Ok(rejected(reason)),
        }
    }

    /// Record a signature, recompute the contract aggregate, and announce completion.
    pub fn sign(
        &self,
        request: SignContractRequest,
    ) -> Result<SignContractResponse, SignatureServiceError> {
        require("signatureImage", &request.signature_image)?;
        require("documentVerification", &request.document_verification)?;

        let Some(contract_id) = self.locate(&request.token)? else {
            return Err(SignatureServiceError::InvalidToken(TokenRejection::NotFound));
        };

        let (contract, status) = self
            .locks
            .with_contract(&contract_id, || -> Result<_, SignatureServiceError> {
                let (mut contract, mut record) = match self.inspect_locked(&request.token)? {
                    TokenCheck::Valid { contract, record } => (contract, record),
                    TokenCheck::Rejected(reason) => {
                        return Err(SignatureServiceError::InvalidToken(reason))
                    }
                };

                if record.signer_document != request.document_verification {
                    warn!(
                        contract_id = %contract.id.0,
                        signer = %record.signer_type,
                        "identity document mismatch on signing attempt"
                    );
                    return Err(SignatureServiceError::Forbidden);
                }

                let now = self.clock.now();
                record.signature_image = Some(request.signature_image);
                record.signed_at = Some(now);
                record.status = SignatureStatus::Signed;
                record.ip_address = request.ip_address;
                record.user_agent = request.user_agent;
                let record = self.signatures.save(record)?;

                let records = self.signatures.find_by_contract(&contract.id)?;
                let status = aggregate_status(&records);
                contract.signature_status = status;
                let contract = self.contracts.save(contract)?;

                info!(
                    contract_id = %contract.id.0,
                    signer = %record.signer_type,
                    status = %status,
                    "signature recorded"
                );
                Ok((contract, status))
            })?;

        if status == ContractSignatureStatus::FullySigned {
            self.send_completion(&contract);
        }

        Ok(SignContractResponse {
            message: "Signature recorded successfully".to_string(),
            contract_status: status,
        })
    }

    /// Read-only projection of a contract's signing progress.
    pub fn status(
        &self,
        contract_id: &ContractId,
    ) -> Result<SignatureStatusView, SignatureServiceError> {
        let contract = self
            .contracts
            .fetch(contract_id)?
            .ok_or(SignatureServiceError::ContractNotFound)?;

        let mut records = self.signatures.find_by_contract(contract_id)?;
        records.sort_by_key(|record| record.signer_type == SignerType::Agent);

        Ok(SignatureStatusView {
            signature_status: contract.signature_status,
            signatures: records.iter().map(SignerSummary::from).collect(),
            is_fully_signed: contract.signature_status == ContractSignatureStatus::FullySigned,
            signature_started_at: contract.signature_started_at,
        })
    }

    /// Extend an outstanding invitation and e-mail it again.
    ///
    /// A pending record keeps its token. An expired record is re-activated with a
    /// fresh token since the old one can no longer be used.
    pub fn resend_invitation(
        &self,
        contract_id: &ContractId,
        signer_type: SignerType,
    ) -> Result<ResendInvitationResponse, SignatureServiceError> {
        let (contract, record) = self
            .locks
            .with_contract(contract_id, || -> Result<_, SignatureServiceError> {
                let contract = self
                    .contracts
                    .fetch(contract_id)?
                    .ok_or(SignatureServiceError::ContractNotFound)?;

                let mut record = self
                    .signatures
                    .find_by_contract_and_type(contract_id, signer_type)?
                    .filter(|record| record.status != SignatureStatus::Signed)
                    .ok_or(SignatureServiceError::PendingSignatureNotFound(signer_type))?;

                let now = self.clock.now();
                if record.status == SignatureStatus::Expired {
                    record.token = token::issue(now);
                    record.status = SignatureStatus::Pending;
                }
                record.token_expiration = self.expiration_from(now)?;
                let record = self.signatures.save(record)?;
                Ok((contract, record))
            })?;

        info!(
            contract_id = %contract.id.0,
            signer = %signer_type,
            expires_at = %record.token_expiration,
            "signature invitation extended"
        );

        let recipient = match signer_type {
            SignerType::Client => contract.client.email.clone(),
            SignerType::Agent => self.config.agent_email.clone(),
        };

        match recipient {
            Some(to) => self.send_invitation(&to, &contract, &record.signer_name, &record.token),
            None => warn!(
                contract_id = %contract.id.0,
                signer = %signer_type,
                "no e-mail on file, invitation not re-sent"
            ),
        }

        Ok(ResendInvitationResponse {
            message: "Invitation re-sent successfully".to_string(),
        })
    }

    fn pending_record(
        &self,
        contract: &Contract,
        signer_type: SignerType,
        now: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> SignatureRecord {
        let (name, document) = contract.signer_identity(signer_type);
        SignatureRecord {
            id: next_signature_id(),
            contract_id: contract.id.clone(),
            signer_type,
            signer_name: name.to_string(),
            signer_document: document.to_string(),
            signature_image: None,
            signed_at: None,
            ip_address: None,
            user_agent: None,
            token: token::issue(now),
            token_expiration: expiration,
            status: SignatureStatus::Pending,
        }
    }

    fn expiration_from(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, SignatureServiceError> {
        self.config
            .token_ttl()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(SignatureServiceError::ExpirationOutOfRange {
                ttl_days: self.config.token_ttl_days,
            })
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    fn locate(&self, token: &SignatureToken) -> Result<Option<ContractId>, RepositoryError> {
        Ok(self
            .signatures
            .find_by_token(token)?
            .map(|record| record.contract_id))
    }

    /// Apply the verification rules in order. Callers hold the contract lock.
    fn inspect_locked(&self, token: &SignatureToken) -> Result<TokenCheck, SignatureServiceError> {
        let Some(mut record) = self.signatures.find_by_token(token)? else {
            return Ok(TokenCheck::Rejected(TokenRejection::NotFound));
        };

        let now = self.clock.now();
        if record.is_expired_at(now) || record.status == SignatureStatus::Expired {
            if record.status == SignatureStatus::Pending {
                warn!(
                    contract_id = %record.contract_id.0,
                    signer = %record.signer_type,
                    "signature token expired"
                );
                record.status = SignatureStatus::Expired;
                self.signatures.save(record)?;
            }
            return Ok(TokenCheck::Rejected(TokenRejection::Expired));
        }

        if record.status == SignatureStatus::Signed {
            return Ok(TokenCheck::Rejected(TokenRejection::AlreadySigned));
        }

        match self.contracts.fetch(&record.contract_id)? {
            Some(contract) => Ok(TokenCheck::Valid { contract, record }),
            None => Ok(TokenCheck::Rejected(TokenRejection::NotFound)),
        }
    }

    fn send_invitation(
        &self,
        to: &str,
        contract: &Contract,
        signer_name: &str,
        token: &SignatureToken,
    ) {
        let url = self.config.signing_url(token.as_str());
        let email = templates::invitation(contract, signer_name, &url, self.config.token_ttl_days);
        self.deliver(to, &contract.id, email, "invitation");
    }

    fn send_completion(&self, contract: &Contract) {
        let now = self.clock.now();
        let recipients = [contract.client.email.as_deref(), self.config.agent_email.as_deref()];
        for to in recipients.into_iter().flatten() {
            self.deliver(to, &contract.id, templates::completion(contract, now), "completion");
        }
    }

    fn deliver(&self, to: &str, contract_id: &ContractId, email: EmailContent, kind: &'static str) {
        if self.notifier.send_email(to, &email.subject, &email.html) {
            debug!(contract_id = %contract_id.0, kind, "signature e-mail dispatched");
        } else {
            warn!(contract_id = %contract_id.0, kind, "signature e-mail delivery failed");
        }
    }
}

fn rejected(reason: TokenRejection) -> TokenVerification {
    TokenVerification {
        is_valid: false,
        contract: None,
        signer_info: None,
        error_message: Some(reason.to_string()),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), SignatureServiceError> {
    if value.trim().is_empty() {
        Err(SignatureServiceError::MissingField(field))
    } else {
        Ok(())
    }
}

/// Why a presented token cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejection {
    #[error("token not valid")]
    NotFound,
    #[error("token expired")]
    Expired,
    #[error("already signed by this party")]
    AlreadySigned,
}

/// Error raised by the signature workflow service.
#[derive(Debug, thiserror::Error)]
pub enum SignatureServiceError {
    #[error("contract not found")]
    ContractNotFound,
    #[error("no pending signature found for signer {0}")]
    PendingSignatureNotFound(SignerType),
    #[error("contract already has a signature process in progress ({current})")]
    InvalidState { current: ContractSignatureStatus },
    #[error("{0}")]
    InvalidToken(TokenRejection),
    #[error("identity document does not match the one registered on the contract")]
    Forbidden,
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("token lifetime of {ttl_days} days does not yield a representable expiration")]
    ExpirationOutOfRange { ttl_days: i64 },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
