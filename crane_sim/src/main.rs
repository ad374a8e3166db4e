mod motion;
mod session;

use clap::Parser;
use crane_lib::{init_tracing, CraneConfig};
use eyre::Result;
use motion::MotionController;
use session::Backend;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "crane_sim")]
#[command(about = "Simulated crane motion backend")]
struct Cli {
    /// Config file; falls back to $CRANE_CONFIG, then config/crane.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overriding backend.bind_addr
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    let config = CraneConfig::load_from_env(cli.config.as_deref())?;
    let bind = cli.bind.unwrap_or_else(|| config.backend.bind_addr.clone());

    let controller = MotionController::new(
        config.motion.initial_state,
        config.motion.max_speeds,
        Arc::new(config.dimensions.clone()),
    );
    let backend = Backend::new(controller, config.motion.tick());
    let motion = tokio::spawn(backend.clone().run_motion());

    let listener = TcpListener::bind(&bind).await?;
    info!("Crane simulator '{}' listening on {}", config.name, bind);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                let backend = backend.clone();
                tokio::spawn(async move {
                    if let Err(e) = backend.serve_client(stream).await {
                        warn!("Session with {} ended with error: {}", peer, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    motion.abort();
    Ok(())
}
