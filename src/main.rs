//! playground-runtime binary entry point.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use playground_runtime::api::serve;
use playground_runtime::cli::{self, Args};
use playground_runtime::config::Config;
use playground_runtime::engine::{NodeScriptHost, PythonLoader};
use playground_runtime::execution::{ExecutionRequest, Language};
use playground_runtime::{logging, SessionManager};
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Run 'playground-runtime --help' for usage.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, BoxError> {
    let config = Config::load(&args)?;
    logging::try_init_with(config.log_filter()).ok();

    let session = Arc::new(SessionManager::new(
        config.to_session_config(),
        PythonLoader::new(config.to_engine_config()),
        NodeScriptHost::new(config.session.node.as_str()),
    ));

    if let Some(path) = args.run.as_deref() {
        return run_file(&session, path).await;
    }

    info!("playground-runtime v{}", env!("CARGO_PKG_VERSION"));
    let server_config = config.to_server_config()?;

    // The API answers with status Initializing until this finishes.
    let init = Arc::clone(&session);
    tokio::spawn(async move {
        if let Err(e) = init.initialize().await {
            error!("session initialization failed: {}", e);
        }
    });

    serve(server_config, session).await?;
    info!("server stopped");
    Ok(true)
}

/// Run one file through a fresh session and print the result.
async fn run_file(session: &SessionManager, path: &Path) -> Result<bool, BoxError> {
    let source = std::fs::read_to_string(path)?;
    let language = Language::from_path(path).unwrap_or_default();

    if language.uses_interpreter() {
        session.initialize().await?;
    }

    let result = session
        .execute_request(ExecutionRequest::new(source).language(language))
        .await?;

    print!("{}", result.stdout);
    if let Some(value) = &result.value {
        println!("{}", value);
    }
    if let Some(description) = result.error_description() {
        eprintln!("{}", description.trim_end());
    }

    Ok(result.is_success())
}
