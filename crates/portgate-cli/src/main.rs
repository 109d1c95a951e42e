//! `portgate` binary: discovers local tool instances and serves them over stdio.

use clap::{Parser, Subcommand};
use portgate_core::GatewayConfig;
use portgate_mcp::{Gateway, StdioServer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portgate", about = "Discovery gateway for local JSON-RPC tool instances")]
struct Cli {
    /// Path to a TOML config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First port of the scan range (overrides config)
    #[arg(long)]
    base_port: Option<u16>,

    /// Number of ports to scan (overrides config)
    #[arg(long)]
    scan_width: Option<u16>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the gateway tools over stdin/stdout
    Serve,
    /// Scan once and print the discovered instances
    Scan,
    /// Scan, then forward one tool call to the active instance
    Call {
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
        /// Instance to route to instead of the first discovered one
        #[arg(long)]
        instance: Option<String>,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the protocol, so logs go to stderr.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(port) = cli.base_port {
        config.base_port = port;
    }
    if let Some(width) = cli.scan_width {
        config.scan_width = width;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = load_config(&cli)?;
    let last_port = config.ports().last().unwrap_or(config.base_port);
    info!(
        "Gateway scanning ports {} to {}",
        config.base_port, last_port
    );
    let mut gateway = Gateway::new(config)?;

    match cli.command {
        Commands::Serve => {
            // Discovery is deferred to the first `tools/list`.
            info!("portgate stdio server running");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            StdioServer::new(gateway)
                .run(stdin, tokio::io::stdout())
                .await?;
        }
        Commands::Scan => {
            gateway.scan().await;
            println!("{}", serde_json::to_string_pretty(&gateway.list())?);
        }
        Commands::Call {
            tool,
            args,
            instance,
        } => {
            let arguments: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| anyhow::anyhow!("Tool arguments are not valid JSON: {e}"))?;
            gateway.scan().await;
            if let Some(id) = instance {
                gateway.switch_active(&id)?;
            }
            let result = gateway.forward(&tool, arguments).await;
            println!("{}", serde_json::to_string_pretty(result.as_value())?);
            if result.is_error() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
