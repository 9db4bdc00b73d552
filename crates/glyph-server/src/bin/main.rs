//! glyph-server binary: ERC-721 metadata text gateway
//!
//! Run with:
//! ```bash
//! RPC_URL_1=https://eth.example CONTRACT_ADDRESS_1=0x... cargo run -p glyph-server
//! ```
//!
//! Variables may also come from a `.env` file in the working directory.

use std::path::PathBuf;

use clap::Parser;
use glyph_core::GatewayConfig;
use glyph_server::{metrics, ServerBuilder, SourceRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glyph-server")]
#[command(about = "Serve ERC-721 token metadata as plain text")]
struct Args {
    /// JSON config file (default: read RPC_URL_<CHAIN_ID> etc. from the environment)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address or port, overrides the config
    #[arg(long)]
    listen: Option<String>,

    /// Chain id probe timeout in milliseconds
    #[arg(long)]
    probe_timeout_ms: Option<u64>,

    /// Gateway used to fetch ipfs:// metadata
    #[arg(long)]
    ipfs_gateway: Option<String>,

    /// Ask every configured RPC endpoint for its chain id and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("glyph_server=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::from_env()?,
    };
    if let Some(listen) = args.listen {
        config = config.with_listen(listen);
    }
    if let Some(ms) = args.probe_timeout_ms {
        config = config.with_probe_timeout_ms(ms);
    }
    if let Some(gateway) = args.ipfs_gateway {
        config = config.with_ipfs_gateway(gateway);
    }

    if args.check {
        let registry = SourceRegistry::from_config(&config).await?;
        let verified = registry.verify().await;
        registry.shutdown().await;
        for chain_id in verified? {
            println!("[OK] chain {} answers eth_chainId", chain_id);
        }
        return Ok(());
    }

    let handle = metrics::init_prometheus_recorder()?;

    let server = ServerBuilder::new(config)
        .metrics(handle)
        .build()
        .await?;

    tracing::info!("Server ready on {}", server.addr());
    server.run().await?;

    Ok(())
}
