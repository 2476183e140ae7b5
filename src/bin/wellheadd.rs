use std::path::PathBuf;
use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Mutex;

use wellhead::{
    FileSessionCache, InMemoryMap, InMemoryTable, Journal, SolverClient, SyncEngine,
    WellheadConfig, create_workspace_router, load_config,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "Path to a YAML or JSON configuration file")]
    config: Option<String>,
    #[arrrg(optional, "Path to the session file holding layer snapshots")]
    session: Option<String>,
    #[arrrg(optional, "Path to the JSONL event journal")]
    journal: Option<String>,
    #[arrrg(optional, "Base URL of the solver service")]
    solver: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const HELP_TEXT: &str = r#"wellheadd - groundwater model workspace daemon

USAGE:
    wellheadd [OPTIONS]

OPTIONS:
    --config <PATH>      YAML or JSON configuration file
    --session <PATH>     Session file with layer snapshots [default: wellhead-session.json]
    --journal <PATH>     JSONL event journal [default: wellhead.jsonl]
    --solver <URL>       Base URL of the solver service [default: http://127.0.0.1:5000]
    --host <HOST>        Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>        Port to bind the HTTP server [default: 8080]
    --verbose            Echo journal entries to stderr

DESCRIPTION:
    Serves one model workspace with endpoints mounted under /api/v1/.
    Layers are restored from the session file at start-up and every save
    writes back to it.

    The server supports graceful shutdown via Ctrl+C.

API ENDPOINTS:
    GET    /api/v1/layer                          List layers
    GET    /api/v1/layer/{layer}                  Get a layer and its features
    POST   /api/v1/layer/{layer}/tool             Select a tool
    POST   /api/v1/layer/{layer}/feature          Draw a feature
    DELETE /api/v1/layer/{layer}/feature/{handle} Delete a feature
    GET    /api/v1/layer/{layer}/table            Show the attribute table
    PUT    /api/v1/layer/{layer}/table/cell       Edit a table cell
    POST   /api/v1/layer/{layer}/save             Save the layer
    POST   /api/v1/layer/{layer}/import           Replace the layer's features
    PUT    /api/v1/layer/{layer}/style            Change the layer color
    POST   /api/v1/solve                          Run the solver
    GET    /api/v1/overlay                        Get the contour overlays"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: wellheadd [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let config = server_config(args)?;
    let verbose = config.verbose;
    let config = config.workspace;

    if verbose {
        println!("wellhead daemon starting with configuration:");
        println!("  Session: {}", config.session_path.display());
        println!("  Journal: {}", config.journal_path.display());
        println!("  Solver: {}", config.solver.url());
        println!("  Bind address: {}", config.bind_address());
    }

    let session = FileSessionCache::open(&config.session_path)
        .map_err(|e| format!("Failed to open session {}: {}", config.session_path.display(), e))?;
    let journal = Journal::durable(config.journal_path.clone()).with_echo(verbose);
    let mut engine =
        SyncEngine::new(InMemoryMap::new(), InMemoryTable::new(), session).with_journal(journal);
    let restored = engine.initialize();

    let engine = Arc::new(Mutex::new(engine));
    let solver = Arc::new(SolverClient::new(&config.solver));
    let app = Router::new().nest("/api/v1", create_workspace_router(engine, solver));

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    println!("wellhead daemon started");
    println!("Server listening on: http://{}", addr);
    println!("Session: {} ({} features restored)", config.session_path.display(), restored);
    println!("Solver: {}", config.solver.url());
    println!("Use Ctrl+C for graceful shutdown");
    println!();

    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            eprintln!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        () = shutdown_signal => {
            println!();
            println!("Shutdown signal received, stopping server");
            println!("wellhead daemon stopped");
        }
    }

    Ok(())
}

struct ServerConfig {
    workspace: WellheadConfig,
    verbose: bool,
}

fn server_config(args: Args) -> Result<ServerConfig, String> {
    let mut workspace = match &args.config {
        Some(path) => load_config(&PathBuf::from(path))?,
        None => WellheadConfig::default(),
    };
    if let Some(session) = args.session {
        workspace.session_path = PathBuf::from(session);
    }
    if let Some(journal) = args.journal {
        workspace.journal_path = PathBuf::from(journal);
    }
    if let Some(solver) = args.solver {
        workspace.solver.base_url = solver;
    }
    if let Some(host) = args.host {
        workspace.host = host;
    }
    if let Some(port) = args.port {
        workspace.port = port;
    }
    Ok(ServerConfig {
        workspace,
        verbose: args.verbose,
    })
}
