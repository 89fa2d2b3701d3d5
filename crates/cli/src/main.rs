mod config;
mod error;
mod logging;
mod repl;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use mcp::ServerConfig;
use runtime::{AnthropicBackend, Backend, Session, ToolProvider, ToolRegistry, spawn_mcp};
use tracing::info;

use config::{API_KEY_ENV, Config};
use error::Result;
use repl::{Browser, LinkOpener, PrintOnly};

const CONFIG_FILE: &str = "relay.toml";

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Chat with an LLM that can call tools served over MCP", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the MCP server script (.py or .js)
    target: PathBuf,

    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Interpreter used to launch the server, instead of python/node
    #[arg(long)]
    command: Option<String>,

    /// Print navigation links instead of opening them in a browser
    #[arg(long)]
    no_open: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    let backend = AnthropicBackend::builder(config.api_key(std::env::var(API_KEY_ENV).ok())?);
    let backend = match &config.backend.base_url {
        Some(url) => backend.base_url(url),
        None => backend,
    };
    let backend = backend.timeout(config.request_timeout()).build()?;
    info!(%backend, "model backend ready");

    let mut server_config = ServerConfig::from_script(&cli.target)?;
    if let Some(command) = cli.command {
        server_config = server_config.with_command(command);
    }
    let server = spawn_mcp(server_config, config.discovery_timeout()).await?;

    let registry = ToolRegistry::new(vec![server])
        .with_discovery_timeout(config.discovery_timeout())
        .with_call_timeout(config.call_timeout());
    let mut session = Session::new(backend, registry, config.model_config());
    if let Some(limit) = config.session.history_limit {
        session = session.with_history_limit(limit);
    }
    info!(session = %session.id, model = %config.backend.model, "session started");

    let opener: &dyn LinkOpener = if cli.no_open { &PrintOnly } else { &Browser };
    let stdin = io::stdin();
    chat(session, stdin.lock(), &mut io::stdout(), opener).await
}

/// Discover tools and run the prompt loop. The providers are released on
/// every path out, including a failed discovery.
async fn chat<B, P, R, W>(
    mut session: Session<B, P>,
    input: R,
    output: &mut W,
    opener: &dyn LinkOpener,
) -> Result<()>
where
    B: Backend,
    P: ToolProvider,
    R: BufRead,
    W: Write,
{
    let result = converse(&mut session, input, output, opener).await;
    session.close().await;
    result
}

async fn converse<B, P, R, W>(
    session: &mut Session<B, P>,
    input: R,
    output: &mut W,
    opener: &dyn LinkOpener,
) -> Result<()>
where
    B: Backend,
    P: ToolProvider,
    R: BufRead,
    W: Write,
{
    let tools = session.discover().await?;
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    writeln!(output, "Connected to server with tools: {names:?}")?;

    repl::run(session, input, output, opener).await?;

    writeln!(output, "\nSession ended.")?;
    Ok(())
}

/// Load the config file; a missing default file means defaults.
fn load_config(path: &Path) -> Result<Config> {
    if path == Path::new(CONFIG_FILE) && !path.exists() {
        return Ok(Config::default());
    }
    Ok(Config::load(path)?)
}
