use crate::infra::{
    ContractDraft, InMemoryContractRepository, InMemorySignatureRepository, OutboxNotifier,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use contract_signing::config::SigningConfig;
use contract_signing::error::AppError;
use contract_signing::workflows::signatures::{
    AgentParty, ClientParty, Contract, ContractFormat, ContractSignatureService, ContractType,
    InitiateSignatureRequest, SignContractRequest, SignatureServiceError, SignatureToken,
};
use std::sync::Arc;

type DemoService =
    ContractSignatureService<InMemoryContractRepository, InMemorySignatureRepository, OutboxNotifier>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Contract start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Base URL of the signing front-end used in invitation links.
    #[arg(long)]
    pub(crate) frontend_url: Option<String>,
    /// Present a wrong identity document for the agent before signing correctly.
    #[arg(long)]
    pub(crate) show_rejection: bool,
    /// Stop once the client has signed, leaving the contract partially signed.
    #[arg(long)]
    pub(crate) skip_agent: bool,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start_date,
        frontend_url,
        show_rejection,
        skip_agent,
    } = args;

    let start_date = start_date.unwrap_or_else(|| Local::now().date_naive());
    let mut config = SigningConfig::default();
    if let Some(url) = frontend_url {
        config.frontend_url = url.trim_end_matches('/').to_string();
    }

    let contracts = Arc::new(InMemoryContractRepository::default());
    let outbox = Arc::new(OutboxNotifier::default());
    let service: DemoService = ContractSignatureService::new(
        contracts.clone(),
        Arc::new(InMemorySignatureRepository::default()),
        outbox.clone(),
        config.clone(),
    );

    println!("Contract signature demo");
    let contract = contracts
        .register(demo_contract(start_date))
        .map_err(SignatureServiceError::from)?;
    println!(
        "- Registered contract #{} ({}) {} | {} -> {}",
        contract.contract_number,
        contract.id.0,
        contract.contract_type.label(),
        contract.formatted_amount(),
        contract.end_date
    );

    let initiated = service.initiate(
        &contract.id,
        InitiateSignatureRequest {
            client_email: contract
                .client
                .email
                .clone()
                .unwrap_or_else(|| "client@example.com".to_string()),
            agent_email: "agent.desk@brokerage.example".to_string(),
        },
    )?;
    println!("- {}", initiated.message);
    println!(
        "  Client link: {}",
        config.signing_url(initiated.tokens.client.as_str())
    );
    println!(
        "  Agent link:  {}",
        config.signing_url(initiated.tokens.agent.as_str())
    );

    let verification = service.verify_token(&initiated.tokens.client)?;
    match (&verification.contract, &verification.signer_info) {
        (Some(summary), Some(signer)) if verification.is_valid => println!(
            "- Client token valid for contract #{} signer {} ({})",
            summary.contract_number, signer.signer_name, signer.signer_type
        ),
        _ => println!(
            "- Client token rejected: {}",
            verification.error_message.as_deref().unwrap_or("unknown reason")
        ),
    }

    sign(&service, &contract, &initiated.tokens.client, &contract.client.document)?;

    if skip_agent {
        print_status(&service, &contract)?;
        print_outbox(&outbox);
        return Ok(());
    }

    if show_rejection {
        match service.sign(signature(&initiated.tokens.agent, "CI-0000000")) {
            Err(err) => println!("- Agent signature with wrong document refused: {}", err),
            Ok(response) => println!(
                "- Unexpectedly accepted mismatched document ({})",
                response.contract_status
            ),
        }
    }

    sign(&service, &contract, &initiated.tokens.agent, &contract.agent.document)?;

    print_status(&service, &contract)?;
    print_outbox(&outbox);
    Ok(())
}

fn sign(
    service: &DemoService,
    contract: &Contract,
    token: &SignatureToken,
    document: &str,
) -> Result<(), AppError> {
    let response = service.sign(signature(token, document))?;
    println!(
        "- Contract #{}: {} -> {}",
        contract.contract_number, response.message, response.contract_status
    );
    Ok(())
}

fn print_status(service: &DemoService, contract: &Contract) -> Result<(), AppError> {
    let status = service.status(&contract.id)?;
    println!(
        "Signature status: {} (fully signed: {})",
        status.signature_status, status.is_fully_signed
    );
    for signer in &status.signatures {
        let signed_at = signer
            .signed_at
            .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  - {} {}: {} at {}",
            signer.signer_type,
            signer.signer_name,
            signer.status.label(),
            signed_at
        );
    }
    Ok(())
}

fn print_outbox(outbox: &OutboxNotifier) {
    let sent = outbox.sent();
    if sent.is_empty() {
        println!("Outbox: no e-mails queued");
        return;
    }
    println!("Outbox:");
    for email in sent {
        println!("  - {} -> {}", email.subject, email.to);
    }
}

fn signature(token: &SignatureToken, document: &str) -> SignContractRequest {
    SignContractRequest {
        token: token.clone(),
        signature_image: "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==".to_string(),
        document_verification: document.to_string(),
        ip_address: Some("127.0.0.1".to_string()),
        user_agent: Some("contract-signing-demo".to_string()),
    }
}

fn demo_contract(start_date: NaiveDate) -> ContractDraft {
    ContractDraft {
        contract_type: ContractType::Anticretic,
        amount_cents: 4_200_000,
        start_date,
        end_date: start_date + Duration::days(730),
        client: ClientParty {
            name: "Rosa Condori".to_string(),
            document: "CI-6123456".to_string(),
            phone: Some("+591 71234567".to_string()),
            email: Some("rosa.condori@example.com".to_string()),
        },
        agent: AgentParty {
            name: "Diego Salazar".to_string(),
            document: "CI-4987001".to_string(),
        },
        content: "<h1>Anticretic agreement</h1><p>Unit 3B, Calle Sagarnaga 210</p>".to_string(),
        format: ContractFormat::Html,
        notes: Some("Keys handed over at signing".to_string()),
    }
}
