use admin_bootstrap::cli::{self, commands, OutputFormat, FetchTokenCli};

#[tokio::main]
async fn main() {
    let args: FetchTokenCli = cli::parse_args();
    cli::finish(run(args).await);
}

async fn run(args: FetchTokenCli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_args(&args.output);
    let config = cli::init()?;
    commands::fetch_token::handle(config, output_format).await
}
