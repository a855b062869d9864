use admin_bootstrap::cli::{self, commands, OutputFormat, SetClaimsCli};

#[tokio::main]
async fn main() {
    let args: SetClaimsCli = cli::parse_args();
    cli::finish(run(args).await);
}

async fn run(args: SetClaimsCli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_args(&args.output);
    let config = cli::init()?;
    commands::set_claims::handle(config, args.uid, output_format).await
}
