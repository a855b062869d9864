use admin_bootstrap::cli::{self, commands, OutputFormat, CreateAdminCli};

#[tokio::main]
async fn main() {
    let args: CreateAdminCli = cli::parse_args();
    cli::finish(run(args).await);
}

async fn run(args: CreateAdminCli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_args(&args.output);
    let config = cli::init()?;
    commands::create_admin::handle(config, output_format).await
}
