//! Subject lines and HTML bodies for signature e-mails.

use chrono::{DateTime, Utc};

use super::domain::Contract;

pub(crate) struct EmailContent {
    pub(crate) subject: String,
    pub(crate) html: String,
}

const STYLE: &str = "body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; } \
.container { max-width: 600px; margin: 0 auto; padding: 20px; } \
.content { padding: 20px; background-color: #f9fafb; } \
.button { display: inline-block; background-color: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; margin: 20px 0; }";

pub(crate) fn invitation(
    contract: &Contract,
    signer_name: &str,
    signing_url: &str,
    ttl_days: i64,
) -> EmailContent {
    let subject = format!(
        "Digital signature required - Contract #{}",
        contract.contract_number
    );
    let html = format!(
        "<!DOCTYPE html>\
<html><head><meta charset=\"UTF-8\"><style>{STYLE}</style></head>\
<body><div class=\"container\">\
<h1>Digital signature invitation</h1>\
<div class=\"content\">\
<p>Dear <strong>{name}</strong>,</p>\
<p>You have been invited to digitally sign <strong>Contract #{number}</strong>.</p>\
<ul><li>Type: {kind}</li><li>Amount: {amount}</li><li>Client: {client}</li><li>Agent: {agent}</li></ul>\
<a href=\"{url}\" class=\"button\">Sign contract</a>\
<ol><li>Open the link above</li><li>Confirm your identity document</li>\
<li>Review the full contract</li><li>Draw your signature</li><li>Confirm</li></ol>\
<p><strong>Important:</strong> this link expires in {ttl_days} days.</p>\
</div><p>This is an automated message, please do not reply.</p></div></body></html>",
        name = escape(signer_name),
        number = contract.contract_number,
        kind = contract.contract_type.label(),
        amount = contract.formatted_amount(),
        client = escape(&contract.client.name),
        agent = escape(&contract.agent.name),
        url = escape(signing_url),
    );

    EmailContent { subject, html }
}

pub(crate) fn completion(contract: &Contract, completed_at: DateTime<Utc>) -> EmailContent {
    let subject = format!("Contract #{} - fully signed", contract.contract_number);
    let html = format!(
        "<!DOCTYPE html>\
<html><head><meta charset=\"UTF-8\"><style>{STYLE}</style></head>\
<body><div class=\"container\">\
<h1>Contract fully signed</h1>\
<div class=\"content\">\
<p><strong>Contract #{number}</strong> has been signed by every party.</p>\
<ul><li>Client: {client}</li><li>Agent: {agent}</li><li>Amount: {amount}</li>\
<li>Completed on: {date}</li></ul>\
<p>The signed contract is available from the administration panel.</p>\
</div></div></body></html>",
        number = contract.contract_number,
        client = escape(&contract.client.name),
        agent = escape(&contract.agent.name),
        amount = contract.formatted_amount(),
        date = completed_at.format("%Y-%m-%d"),
    );

    EmailContent { subject, html }
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
