//! turnloop binary entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnloop::agent_loop::{Console, StdConsole, TurnLoop};
use turnloop::cli::{format_error_help, Cli};
use turnloop::config::SessionConfig;
use turnloop::error::TurnloopError;
use turnloop::provider::OpenAiResponsesEndpoint;
use turnloop::tools::builtin::FlightDesk;
use turnloop::tools::ToolRegistry;

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never interleave with the chat on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "turnloop=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse_args();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), TurnloopError> {
    let mut config = SessionConfig::from_env()?;
    cli.apply(&mut config)?;

    let desk = Arc::new(FlightDesk::default());
    let mut registry = ToolRegistry::new();
    for tool in FlightDesk::tools(&desk) {
        registry.register(tool)?;
    }

    let endpoint = OpenAiResponsesEndpoint::new(
        config.model.clone(),
        config.require_api_key()?,
        Some(config.base_url.clone()),
    );
    let mut turn_loop = TurnLoop::new(
        Arc::new(endpoint),
        Arc::new(registry),
        config.loop_settings(),
    );
    let mut console = StdConsole::new();

    let finished = {
        let run = turn_loop.run(&mut console);
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        }
    };

    match finished {
        Some(result) => result,
        None => {
            tracing::info!(session_id = %turn_loop.session_id(), "Interrupted");
            console.dump_log(turn_loop.conversation().turns());
            Ok(())
        }
    }
}
