use serde_json::{json, Value};

use crate::bootstrap::{self, Services, TokenReport};
use crate::cli::utils::{output_success, output_warning, rule, success_body};
use crate::cli::OutputFormat;
use crate::config::BootstrapConfig;
use crate::error::BootstrapError;

const SUCCESS_MESSAGE: &str = "Admin token generated";

const AUTHENTICATION_HINTS: &[&str] = &[
    "FIREBASE_API_KEY is the Web API Key of this project",
    "create-admin has been run for this account",
    "ADMIN_EMAIL and ADMIN_PASSWORD are correct",
];

pub async fn handle(config: BootstrapConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let account = config.admin_account()?;
    config.api_key()?;
    let services = Services::connect(&config)?;

    if matches!(output_format, OutputFormat::Text) {
        println!("🔄 Authenticating admin user...");
    }

    let report = match bootstrap::fetch_token(&services.identity, &account.email, &account.password).await {
        Ok(report) => report,
        Err(e) => {
            if matches!(output_format, OutputFormat::Text) {
                if let Some(hints) = remediation_hints(&e) {
                    eprintln!("💡 Make sure that:");
                    for (i, hint) in hints.iter().enumerate() {
                        eprintln!("{}. {}", i + 1, hint);
                    }
                }
            }
            return Err(e.into());
        }
    };
    render(&report, &output_format)
}

/// Follow-up checks worth printing for a failed sign-in.
pub fn remediation_hints(err: &BootstrapError) -> Option<&'static [&'static str]> {
    match err {
        BootstrapError::AuthenticationFailure(_) => Some(AUTHENTICATION_HINTS),
        _ => None,
    }
}

/// Body printed in JSON mode.
pub fn json_body(report: &TokenReport) -> Value {
    let mut data = json!(report);
    data["missing_admin_claim"] = json!(report.missing_admin_claim());
    success_body(SUCCESS_MESSAGE, Some(data))
}

fn render(report: &TokenReport, output_format: &OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_body(report))?);
            Ok(())
        }
        OutputFormat::Text => {
            println!();
            println!("{}", rule());
            output_success(output_format, "ADMIN TOKEN GENERATED", None)?;
            println!("{}", rule());
            println!();
            println!("Token (send as `Authorization: Bearer <token>`):");
            println!();
            println!("{}", report.token);
            println!();
            println!("{}", rule());
            println!();
            println!("User info:");
            println!("Email: {}", report.email.as_deref().unwrap_or("unknown"));
            println!("UID: {}", report.uid);
            println!("Admin: {}", report.admin);
            println!("Role: {}", report.role.as_deref().unwrap_or("none"));

            if report.missing_admin_claim() {
                output_warning(output_format, "this user does NOT have admin privileges. Run create-admin first.");
            }

            println!();
            println!("Expires at: {}", report.expires_at.to_rfc3339());
            Ok(())
        }
    }
}
