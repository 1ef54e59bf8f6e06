use super::domain::{Contract, ContractId, SignatureRecord, SignatureToken, SignerType};

/// Contract storage owned by the contract-management collaborator.
pub trait ContractRepository: Send + Sync {
    fn fetch(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError>;
    fn save(&self, contract: Contract) -> Result<Contract, RepositoryError>;
}

/// Storage for per-signer records. Tokens are unique across every contract.
pub trait SignatureRepository: Send + Sync {
    fn find_by_token(
        &self,
        token: &SignatureToken,
    ) -> Result<Option<SignatureRecord>, RepositoryError>;
    fn find_by_contract_and_type(
        &self,
        contract_id: &ContractId,
        signer_type: SignerType,
    ) -> Result<Option<SignatureRecord>, RepositoryError>;
    fn find_by_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<SignatureRecord>, RepositoryError>;
    /// Persist every record or none of them.
    fn save_all(&self, records: Vec<SignatureRecord>) -> Result<(), RepositoryError>;
    fn save(&self, record: SignatureRecord) -> Result<SignatureRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound e-mail hook. Delivery failures come back as `false`, never as a panic.
pub trait Notifier: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, html_body: &str) -> bool;
}
