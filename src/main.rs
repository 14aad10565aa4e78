use anyhow::Result;
use clap::{Arg, Command};
use revert_client::config::{Config, NetworkConfig};
use revert_client::ethereum::abi::MethodRegistry;
use revert_client::ethereum::network::SupportedNetwork;
use revert_client::server::RevertClientServer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = Command::new("revert-client")
        .version("0.1.0")
        .about("Ethereum contract client with revert reason recovery, served over MCP")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .help("Default network to use (mainnet, kovan, goerli, ropsten, rinkeby)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .help("RPC endpoint URL for the default network"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .help("Allow write operations (transactions)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = matches.get_one::<String>("config").map(|s| s.as_str());
    let mut config = Config::load_or_default(config_path).await;

    if let Some(network) = matches.get_one::<String>("network") {
        config.default_network = network.to_lowercase();
    }

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        match config.networks.get_mut(&config.default_network) {
            Some(network_config) => network_config.rpc_url = rpc_url.clone(),
            None => {
                let network: SupportedNetwork = config.default_network.parse()?;
                config.networks.insert(
                    network.to_string(),
                    NetworkConfig {
                        rpc_url: rpc_url.clone(),
                        chain_id: network.chain_id(),
                        explorer_url: None,
                    },
                );
            }
        }
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    info!("Default network: {}", config.default_network);
    info!("Revert history network: {}", config.revert.history_network);
    info!(
        "Write operations allowed: {}",
        config.security.allow_write_operations
    );

    let registry = MethodRegistry::load(&config.methods).await?;
    let server = RevertClientServer::new(config, registry)?;

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
