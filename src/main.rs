use std::process;

use anyhow::{Context, Result};
use blog_api::config::server::ServerConfig;
use blog_api::config::ConfigArgs;
use blog_api::logs;
use clap::Parser;
use log::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct ServerArgs {
    /// Print server configuration data (JSON) and exit.
    #[arg(long)]
    pub print_config: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

async fn run(args: ServerArgs) -> Result<()> {
    let cfg: ServerConfig = args.config.load("server")?;

    if args.print_config {
        let json = serde_json::to_string_pretty(&cfg).context("encode config")?;
        println!("{json}");
        return Ok(());
    }

    logs::init(&cfg.log_level)?;

    let ctx = cfg.build_ctx()?;
    let restful_server = cfg.build_restful_server(ctx)?;

    restful_server.run().await.context("run restful server")?;

    info!("Server exited by user");
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();
    if let Err(e) = run(args).await {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
