use chrono::NaiveDate;
use contract_signing::workflows::signatures::{
    AgentParty, ClientParty, Contract, ContractFormat, ContractId, ContractRepository,
    ContractSignatureStatus, ContractStatus, ContractType, Notifier, RepositoryError,
    SignatureId, SignatureRecord, SignatureRepository, SignatureToken, SignerType,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Contract fields supplied at intake; identity and signature state are assigned on registration.
#[derive(Debug, Clone)]
pub(crate) struct ContractDraft {
    pub(crate) contract_type: ContractType,
    pub(crate) amount_cents: u64,
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
    pub(crate) client: ClientParty,
    pub(crate) agent: AgentParty,
    pub(crate) content: String,
    pub(crate) format: ContractFormat,
    pub(crate) notes: Option<String>,
}

fn guard<'a, T>(mutex: &'a Mutex<T>, store: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{store} store poisoned")))
}

#[derive(Default)]
pub(crate) struct InMemoryContractRepository {
    records: Mutex<HashMap<ContractId, Contract>>,
    sequence: AtomicU32,
}

impl InMemoryContractRepository {
    pub(crate) fn register(&self, draft: ContractDraft) -> Result<Contract, RepositoryError> {
        let number = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let contract = Contract {
            id: ContractId(format!("ctr-{number:05}")),
            contract_number: number,
            contract_type: draft.contract_type,
            status: ContractStatus::Active,
            amount_cents: draft.amount_cents,
            start_date: draft.start_date,
            end_date: draft.end_date,
            client: draft.client,
            agent: draft.agent,
            content: draft.content,
            format: draft.format,
            notes: draft.notes,
            signature_status: ContractSignatureStatus::NoRequired,
            signature_started_at: None,
        };

        let mut records = guard(&self.records, "contract")?;
        if records.contains_key(&contract.id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }
}

impl ContractRepository for InMemoryContractRepository {
    fn fetch(&self, id: &ContractId) -> Result<Option<Contract>, RepositoryError> {
        Ok(guard(&self.records, "contract")?.get(id).cloned())
    }

    fn save(&self, contract: Contract) -> Result<Contract, RepositoryError> {
        let mut records = guard(&self.records, "contract")?;
        if !records.contains_key(&contract.id) {
            return Err(RepositoryError::NotFound);
        }
        records.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }
}

#[derive(Default)]
pub(crate) struct InMemorySignatureRepository {
    records: Mutex<HashMap<SignatureId, SignatureRecord>>,
}

impl SignatureRepository for InMemorySignatureRepository {
    fn find_by_token(
        &self,
        token: &SignatureToken,
    ) -> Result<Option<SignatureRecord>, RepositoryError> {
        let records = guard(&self.records, "signature")?;
        Ok(records.values().find(|record| &record.token == token).cloned())
    }

    fn find_by_contract_and_type(
        &self,
        contract_id: &ContractId,
        signer_type: SignerType,
    ) -> Result<Option<SignatureRecord>, RepositoryError> {
        let records = guard(&self.records, "signature")?;
        Ok(records
            .values()
            .find(|record| &record.contract_id == contract_id && record.signer_type == signer_type)
            .cloned())
    }

    fn find_by_contract(
        &self,
        contract_id: &ContractId,
    ) -> Result<Vec<SignatureRecord>, RepositoryError> {
        let records = guard(&self.records, "signature")?;
        Ok(records
            .values()
            .filter(|record| &record.contract_id == contract_id)
            .cloned()
            .collect())
    }

    fn save_all(&self, batch: Vec<SignatureRecord>) -> Result<(), RepositoryError> {
        let mut records = guard(&self.records, "signature")?;
        let clashes = batch.iter().enumerate().any(|(index, record)| {
            records
                .values()
                .any(|existing| existing.token == record.token && existing.id != record.id)
                || batch[..index].iter().any(|other| other.token == record.token)
        });
        if clashes {
            return Err(RepositoryError::Conflict);
        }
        for record in batch {
            records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    fn save(&self, record: SignatureRecord) -> Result<SignatureRecord, RepositoryError> {
        let mut records = guard(&self.records, "signature")?;
        if records
            .values()
            .any(|existing| existing.token == record.token && existing.id != record.id)
        {
            return Err(RepositoryError::Conflict);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundEmail {
    pub(crate) to: String,
    pub(crate) subject: String,
}

/// Stands in for the mail relay: every message is logged and kept in memory.
#[derive(Default)]
pub(crate) struct OutboxNotifier {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl OutboxNotifier {
    pub(crate) fn sent(&self) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for OutboxNotifier {
    fn send_email(&self, to: &str, subject: &str, html_body: &str) -> bool {
        let Ok(mut sent) = self.sent.lock() else {
            return false;
        };
        info!(to, subject, bytes = html_body.len(), "e-mail queued in outbox");
        sent.push(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
        });
        true
    }
}
