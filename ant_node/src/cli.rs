use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::bootstrap::provision_credentials;
use crate::config::{load_config_file, CommonOptions, StartConfig, StartOptions};
use crate::node::{LaunchParams, NodeRuntime};
use crate::password::TerminalPrompt;
use crate::service::{run_foreground, NodeProgram, ServiceHost, ServiceMode, SERVICE_NAME};
use crate::shutdown::{Interrupts, ShutdownOrchestrator};
use crate::{logging, VERSION};

#[derive(Parser)]
#[command(name = "ant", author, version, about = "Ant node", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.ant.json)
    #[arg(long, global = true, env = "ANT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an ant node
    Start(StartOptions),
    /// Create the node's keys and exit
    Init(CommonOptions),
    /// Print the version
    Version,
}

pub async fn run() -> Result<()> {
    // load .env for local development (if present)
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Start(options) => {
            let file: StartOptions = load_config_file(cli.config.as_deref())?;
            start(options.merge(file)).await
        }
        Commands::Init(options) => {
            let file: StartOptions = load_config_file(cli.config.as_deref())?;
            init(options.merge(file.common)).await
        }
        Commands::Version => {
            println!("{}", VERSION);
            Ok(())
        }
    }
}

async fn start(options: StartOptions) -> Result<()> {
    logging::init(options.common.verbosity())?;

    let config = StartConfig::resolve(options)?;
    tracing::info!("version: {}", VERSION);

    let credentials = provision_credentials(&config.bootstrap, &TerminalPrompt).await?;

    let node = NodeRuntime::launch(LaunchParams {
        p2p_addr: config.node.p2p_addr.clone(),
        public_key: credentials.public_key,
        signer: credentials.signer,
        network_id: config.network_id,
        network_identity_key: credentials.network_identity_key,
        messaging_key: credentials.messaging_key,
        options: config.node,
    })
    .await?;

    let interrupts = Interrupts::listen().context("listen for interrupt signals")?;
    let orchestrator = ShutdownOrchestrator::new(interrupts, Arc::new(node));
    let program = Arc::new(NodeProgram::new(orchestrator));

    match ServiceMode::detect() {
        ServiceMode::Foreground => run_foreground(program.as_ref()).await,
        ServiceMode::Service => {
            // systemd stops the unit with SIGTERM, which ends `start`.
            let (host, _handle) = ServiceHost::new(SERVICE_NAME);
            host.run(program).await;
        }
    }
    Ok(())
}

async fn init(options: CommonOptions) -> Result<()> {
    logging::init(options.verbosity())?;

    let config = options.bootstrap_config()?;
    let credentials = provision_credentials(&config, &TerminalPrompt).await?;
    tracing::debug!("keys ready for {}", credentials.ethereum_address);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli =
            Cli::try_parse_from(["ant", "start", "--full-node", "--network-id", "5"]).unwrap();
        match cli.command {
            Commands::Start(options) => {
                assert_eq!(options.full_node, Some(true));
                assert_eq!(options.network_id, Some(5));
                assert_eq!(options.bootnode, None);
            }
            _ => panic!("expected start"),
        }

        let args = ["ant", "init", "--data-dir", "/tmp/ant", "--config", "/tmp/ant.json"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ant.json")));
        assert!(matches!(
            cli.command,
            Commands::Init(ref o) if o.data_dir.as_deref() == Some("/tmp/ant")
        ));

        let cli = Cli::try_parse_from(["ant", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn init_rejects_node_options() {
        assert!(Cli::try_parse_from(["ant", "init", "--full-node"]).is_err());
    }
}
