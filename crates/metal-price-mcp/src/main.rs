//! metal-price MCP server — entry point.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use metal_price::PriceFetcher;
use metal_price_mcp::config::{resolve_fetch_config, FetchOverrides};
use metal_price_mcp::protocol::ProtocolHandler;
use metal_price_mcp::tools::{get_silver_price, ToolRegistry};
use metal_price_mcp::transport::StdioTransport;
use metal_price_mcp::types::ToolContent;

#[derive(Parser)]
#[command(
    name = "metal-price-mcp",
    about = "MCP server for the live MCX silver futures quote",
    version
)]
struct Cli {
    #[command(flatten)]
    fetch: FetchArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct FetchArgs {
    /// Quote page URL (env: METAL_PRICE_URL).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Acquisition mode: http, browser or auto (env: METAL_PRICE_MODE).
    #[arg(long, global = true)]
    mode: Option<String>,

    /// HTTP and navigation timeout in seconds (env: METAL_PRICE_TIMEOUT_SECS).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Longest wait for the quote to render, in seconds (env: METAL_PRICE_SETTLE_SECS).
    #[arg(long, global = true)]
    settle: Option<u64>,

    /// Chromium binary (env: METAL_PRICE_CHROMIUM_PATH).
    #[arg(long, global = true)]
    chromium: Option<String>,

    /// Attach a PNG of the rendered page (env: METAL_PRICE_CAPTURE_CHART).
    #[arg(long, global = true)]
    capture_chart: bool,
}

impl From<FetchArgs> for FetchOverrides {
    fn from(args: FetchArgs) -> Self {
        FetchOverrides {
            url: args.url,
            mode: args.mode,
            timeout_secs: args.timeout,
            settle_secs: args.settle,
            chromium: args.chromium,
            capture_chart: args.capture_chart,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Fetch the quote once and print the tool output.
    Fetch,

    /// Print server capabilities and tools as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   metal-price-mcp completions bash > ~/.local/share/bash-completion/completions/metal-price-mcp
    ///   metal-price-mcp completions zsh > ~/.zfunc/_metal-price-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn build_registry(args: FetchArgs) -> anyhow::Result<ToolRegistry> {
    let config = resolve_fetch_config(&args.into())?;
    tracing::info!(
        "Source: {} (mode {}, timeout {}s)",
        config.url,
        config.mode,
        config.http_timeout.as_secs()
    );
    let fetcher = PriceFetcher::new(config)?;
    Ok(ToolRegistry::new(fetcher))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    // stdout carries protocol frames; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let registry = build_registry(cli.fetch)?;
            let handler = ProtocolHandler::new(registry);
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Fetch => {
            let registry = build_registry(cli.fetch)?;
            let result = registry.call(get_silver_price::NAME, None).await?;
            for item in &result.content {
                match item {
                    ToolContent::Text { text } => println!("{text}"),
                    ToolContent::Image { data, mime_type } => {
                        eprintln!("[{mime_type} attachment, {} base64 chars]", data.len());
                    }
                }
            }
            if result.is_error == Some(true) {
                std::process::exit(1);
            }
        }

        Commands::Info => {
            let capabilities = metal_price_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::definitions();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "metal-price-mcp", &mut std::io::stdout());
        }
    }

    Ok(())
}
