use serde_json::{json, Value};

use crate::bootstrap::{self, ClaimsReport, Services};
use crate::cli::utils::{output_success, success_body};
use crate::cli::OutputFormat;
use crate::config::BootstrapConfig;

pub async fn handle(config: BootstrapConfig, uid: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let uid = config.target_uid(uid)?;
    let services = Services::connect(&config)?;

    let report = bootstrap::set_claims_only(&services.identity, &uid).await?;

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_body(&report))?);
            Ok(())
        }
        OutputFormat::Text => output_success(&output_format, &success_message(&report), None),
    }
}

fn success_message(report: &ClaimsReport) -> String {
    format!("Admin role set for user: {}", report.uid)
}

/// Body printed in JSON mode.
pub fn json_body(report: &ClaimsReport) -> Value {
    success_body(&success_message(report), Some(json!(report)))
}
