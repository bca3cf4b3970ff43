use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("komsai_cup=info")),
        )
        .init();

    let (addr, config) = match cli::run() {
        cli::RunOutcome::Serve { addr, config } => (addr, config),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    let state = match komsai_cup::state::AppState::from_config(config) {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "failed to start");
            std::process::exit(1);
        }
    };

    if let Err(err) = komsai_cup::serve(addr, state).await {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}
