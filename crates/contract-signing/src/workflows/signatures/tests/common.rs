use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::SigningConfig;
use crate::workflows::signatures::clock::Clock;
use crate::workflows::signatures::domain::{
    AgentParty, ClientParty, Contract, ContractFormat, ContractId, ContractSignatureStatus,
    ContractStatus, ContractType, SignatureId, SignatureRecord, SignatureToken, SignerType,
};
use crate::workflows::signatures::repository::{
    ContractRepository, Notifier, RepositoryError, SignatureRepository,
};
use crate::workflows::signatures::{
    signature_router, ContractSignatureService, InitiateSignatureRequest, InitiateSignatureResponse,
    SignContractRequest,
};

pub(super) const CLIENT_DOCUMENT: &str = "CI-4455120";
pub(super) const AGENT_DOCUMENT: &str = "CI-7781234";
pub(super) const CLIENT_EMAIL: &str = "maria.quispe@example.com";
pub(super) const AGENT_EMAIL: &str = "agent.rojas@brokerage.example";

pub(super) type TestService =
    ContractSignatureService<MemoryContracts, MemorySignatures, RecordingNotifier>;

pub(super) fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 24, 14, 30, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn contract(id: &str) -> Contract {
    Contract {
        id: ContractId(id.to_string()),
        contract_number: 1042,
        contract_type: ContractType::Sale,
        status: ContractStatus::Active,
        amount_cents: 12_500_000,
        start_date: NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 9, 30).expect("valid date"),
        client: ClientParty {
            name: "Maria Quispe".to_string(),
            document: CLIENT_DOCUMENT.to_string(),
            phone: Some("+591 70000000".to_string()),
            email: Some(CLIENT_EMAIL.to_string()),
        },
        agent: AgentParty {
            name: "Luis Rojas".to_string(),
            document: AGENT_DOCUMENT.to_string(),
        },
        content: "<h1>Sale agreement</h1>".to_string(),
        format: ContractFormat::Html,
        notes: None,
        signature_status: ContractSignatureStatus::NoRequired,
        signature_started_at: None,
    }
}

pub(super) fn initiate_request() -> InitiateSignatureRequest {
    InitiateSignatureRequest {
        client_email: CLIENT_EMAIL.to_string(),
        agent_email: AGENT_EMAIL.to_string(),
    }
}

pub(super) fn sign_request(token: &SignatureToken, document: &str) -> SignContractRequest {
    SignContractRequest {
        token: token.clone(),
        signature_image: "data:image/png;base64,iVBORw0KGgo=".to_string(),
        document_verification: document.to_string(),
        ip_address: Some("198.51.100.20".to_string()),
        user_agent: Some("Mozilla/5.0".to_string()),
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<TestService>,
    pub(super) contracts: Arc<MemoryContracts>,
    pub(super) signatures: Arc<MemorySignatures>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    harness_with_config(SigningConfig::default())
}

pub(super) fn harness_with_config(config: SigningConfig) -> Harness {
    let contracts = Arc::new(MemoryContracts::default());
    let signatures = Arc::new(MemorySignatures::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(start_instant()));
    let service = Arc::new(ContractSignatureService::with_clock(
        contracts.clone(),
        signatures.clone(),
        notifier.clone(),
        config,
        clock.clone(),
    ));

    contracts.insert(contract("ctr-1"));

    Harness {
        service,
        contracts,
        signatures,
        notifier,
        clock,
    }
}

impl Harness {
    pub(super) fn contract_id(&self) -> ContractId {
        ContractId("ctr-1".to_string())
    }

    pub(super) fn initiate(&self) -> InitiateSignatureResponse {
        self.service
            .initiate(&self.contract_id(), initiate_request())
            .expect("initiation succeeds")
    }

    pub(super) fn stored_contract(&self) -> Contract {
        self.contracts
            .fetch(&self.contract_id())
            .expect("fetch succeeds")
            .expect("contract present")
    }

    pub(super) fn stored_record(&self, signer_type: SignerType) -> SignatureRecord {
        self.signatures
            .find_by_contract_and_type(&self.contract_id(), signer_type)
            .expect("fetch succeeds")
            .expect("record present")
    }

    pub(super) fn router(&self) -> axum::Router {
        signature_router(self.service.clone())
    }
}

pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryContracts {
    records: Arc<Mutex<HashMap<ContractId, Contract>>>,
}

impl MemoryContracts {
    pub(super) fn insert(&self, contract: Contract) {
        self.records
            .lock()
            .expect("contract mutex poisoned")
            .insert(contract.id.clone(), contract);
    }
}

impl ContractRepository for MemoryContracts {
    fn fetch(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        let guard = self.records.lock().expect("contract mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(&self, contract: Contract) -> Result<Contract, RepositoryError> {
        let mut guard = self.records.lock().expect("contract mutex poisoned");
        guard.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySignatures {
    records: Arc<Mutex<HashMap<SignatureId, SignatureRecord>>>,
}

impl MemorySignatures {
    pub(super) fn all(&self) -> Vec<SignatureRecord> {
        self.records
            .lock()
            .expect("signature mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl SignatureRepository for MemorySignatures {
    fn find_by_token(
        &self,
        token: &SignatureToken,
    ) -> Result<Option<SignatureRecord>, RepositoryError> {
        let guard = self.records.lock().expect("signature mutex poisoned");
        Ok(guard.values().find(|record| &record.token == token).cloned())
    }

    fn find_by_contract_and_type(
        &self,
        contract_id: &ContractId,
        signer_type: SignerType,
    ) -> Result<Option<SignatureRecord>, RepositoryError> {
        let guard = self.records.lock().expect("signature mutex poisoned");
        Ok(guard
            .values()
            .find(|record| &record.contract_id == contract_id && record.signer_type == signer_type)
            .cloned())
    }

    fn find_by_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<SignatureRecord>, RepositoryError> {
        let guard = self.records.lock().expect("signature mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| &record.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn save_all(&self, records: Vec<SignatureRecord>) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("signature mutex poisoned");
        for record in &records {
            if guard.values().any(|existing| existing.token == record.token) {
                return Err(RepositoryError::Conflict);
            }
        }
        for record in records {
            guard.insert(record.id.clone(), record);
        }
        Ok(())
    }

    fn save(&self, record: SignatureRecord) -> Result<SignatureRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("signature mutex poisoned");
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentEmail {
    pub(super) to: String,
    pub(super) subject: String,
    pub(super) html: String,
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<SentEmail>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub(super) fn with_subject(&self, needle: &str) -> Vec<SentEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.subject.contains(needle))
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send_email(&self, to: &str, subject: &str, html_body: &str) -> bool {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(SentEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html_body.to_string(),
            });
        !self.failing.load(Ordering::SeqCst)
    }
}

pub(super) struct UnavailableSignatures;

impl SignatureRepository for UnavailableSignatures {
    fn find_by_token(
        &self,
        _token: &SignatureToken,
    ) -> Result<Option<SignatureRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_contract_and_type(
        &self,
        _contract_id: &ContractId,
        _signer_type: SignerType,
    ) -> Result<Option<SignatureRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_contract(
        &self,
        _contract_id: &ContractId,
    ) -> Result<Vec<SignatureRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_all(&self, _records: Vec<SignatureRecord>) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save(&self, _record: SignatureRecord) -> Result<SignatureRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
