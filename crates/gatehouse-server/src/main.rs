use anyhow::Result;
use clap::Parser;
use gatehouse_server::{ServerConfig, cli::Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    gatehouse_server::run(config).await
}
