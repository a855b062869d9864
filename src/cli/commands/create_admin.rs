use serde_json::{json, Value};

use crate::bootstrap::{self, CreateAdminReport, Services};
use crate::cli::utils::{output_success, print_block, success_body};
use crate::cli::OutputFormat;
use crate::config::BootstrapConfig;

pub async fn handle(config: BootstrapConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    // Fail on missing settings before touching the network
    let account = config.admin_account()?;
    let services = Services::connect(&config)?;

    if matches!(output_format, OutputFormat::Text) {
        println!("🔄 Creating admin account...");
    }

    let report = bootstrap::create_admin(&services.identity, &services.profiles, &account).await?;
    render(&report, &output_format)
}

/// Body printed in JSON mode.
pub fn json_body(report: &CreateAdminReport) -> Value {
    success_body("Admin account ready", Some(json!(report)))
}

fn render(report: &CreateAdminReport, output_format: &OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_body(report))?);
            Ok(())
        }
        OutputFormat::Text => {
            if report.created {
                println!("✓ Auth user created: {}", report.uid);
            } else {
                println!("✓ Found existing user: {}", report.uid);
            }
            println!("✓ Admin custom claims set");
            println!("✓ Admin profile document written");
            println!();
            output_success(output_format, "ADMIN ACCOUNT READY", None)?;
            print_block(&[
                ("Email", report.email.clone()),
                ("UID", report.uid.clone()),
                ("Role", report.claims.role.clone()),
                ("Password", "as configured in ADMIN_PASSWORD".to_string()),
            ]);
            println!();
            println!("Next steps:");
            println!("1. Sign in with these credentials in the app");
            println!("2. Run fetch-admin-token to mint an ID token");
            println!("3. Send the token as a Bearer token on admin API requests");
            Ok(())
        }
    }
}
