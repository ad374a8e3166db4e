mod operator;

use clap::Parser;
use crane_lib::{
    init_tracing, Command, ConnectionManager, ConnectionState, CraneConfig, Delivery, Segment,
    StateReconciler,
};
use eyre::Result;
use operator::{parse_line, OperatorInput, HELP};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{error, info, warn};

const MAX_RECONNECT_SECS: u64 = 3600;

#[derive(Parser)]
#[command(name = "crane_console")]
#[command(about = "Drive the crane from the terminal")]
struct Cli {
    /// Config file; falls back to $CRANE_CONFIG, then config/crane.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Backend URL, overriding the config
    #[arg(short, long)]
    url: Option<String>,

    /// Reconnect automatically this many seconds after the link drops (1 to 3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_RECONNECT_SECS))]
    reconnect_secs: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    let mut config = CraneConfig::load_from_env(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.backend.url = url;
        config.validate()?;
    }
    info!("Loaded configuration '{}'", config.name);

    let (connection, mut events) = ConnectionManager::new();
    let mut connection = connection.with_connect_timeout(config.backend.connect_timeout());
    let mut reconciler = StateReconciler::new(Arc::new(config.dimensions.clone()));

    let reconnect_delay = cli.reconnect_secs.map(Duration::from_secs);
    let mut reconnect_at: Option<Instant> = None;
    let mut operator_closed = false;

    if connection.connect(&config.backend.url).await.is_err() {
        reconnect_at = reconnect_deadline(reconnect_delay);
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                let input = match parse_line(&line) {
                    Ok(Some(input)) => input,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                };

                match input {
                    OperatorInput::Joints(joints) => {
                        let command = Command::joints(joints, reconciler.orientation());
                        submit(&mut reconciler, &mut connection, command);
                    }
                    OperatorInput::Xyz(position) => {
                        let command = Command::position(position, reconciler.orientation());
                        submit(&mut reconciler, &mut connection, command);
                    }
                    OperatorInput::Orient(orientation) => {
                        reconciler.set_orientation(orientation);
                        render(&reconciler);
                    }
                    OperatorInput::State => print_state(&reconciler, &connection),
                    OperatorInput::Pose => print_pose(&reconciler),
                    OperatorInput::Reconnect => {
                        operator_closed = false;
                        reconnect_at = None;
                        if connection.connect(&config.backend.url).await.is_err() {
                            reconnect_at = reconnect_deadline(reconnect_delay);
                        }
                    }
                    OperatorInput::Close => {
                        operator_closed = true;
                        reconnect_at = None;
                        connection.close();
                        reconciler.reset();
                    }
                    OperatorInput::Quit => break,
                    OperatorInput::Help => println!("{}", HELP),
                }
            }

            Some(event) = events.recv() => {
                if let Some(text) = connection.accept(event) {
                    if reconciler.on_message(&text).is_ok() {
                        render(&reconciler);
                    }
                } else if connection.state() == ConnectionState::Closed
                    && !operator_closed
                    && reconnect_at.is_none()
                {
                    reconnect_at = reconnect_deadline(reconnect_delay);
                    if let Some(delay) = reconnect_delay {
                        info!("Reconnecting in {}s", delay.as_secs());
                    }
                }
            }

            _ = tokio::time::sleep_until(reconnect_at.unwrap_or_else(Instant::now)),
                if reconnect_at.is_some() =>
            {
                reconnect_at = None;
                if connection.connect(&config.backend.url).await.is_err() {
                    reconnect_at = reconnect_deadline(reconnect_delay);
                }
            }
        }
    }

    connection.close();
    info!("Console shutting down");
    Ok(())
}

/// When to retry the link, if automatic reconnection is on.
fn reconnect_deadline(delay: Option<Duration>) -> Option<Instant> {
    delay.and_then(|d| Instant::now().checked_add(d))
}

fn submit(reconciler: &mut StateReconciler, connection: &mut ConnectionManager, command: Command) {
    match reconciler.on_submit(command, connection) {
        Ok(Delivery::Sent) => info!("Sent {:?}", command.target),
        Ok(Delivery::Dropped) => warn!("Not connected; command recorded but not sent"),
        Err(e) => error!("Rejected: {}", e),
    }
}

/// Stand-in for the renderer: report the recomputed end effector.
fn render(reconciler: &StateReconciler) {
    let state = reconciler.state();
    let pose = reconciler.pose();
    let j = &state.current_joint_state;

    info!(
        concat!(
            "[{}] swing {:.1} lift {:.3} elbow {:.1} wrist {:.1} gripper {:.2}",
            " -> end effector ({:.3}, {:.3}, {:.3})"
        ),
        state.status,
        j.swing,
        j.lift,
        j.elbow,
        j.wrist,
        j.gripper,
        pose.end_effector.x,
        pose.end_effector.y,
        pose.end_effector.z
    );

    if let Some(target) = reconciler.target_position() {
        info!(
            "Target ({:.3}, {:.3}, {:.3}), {:.3} m away",
            target.x,
            target.y,
            target.z,
            target.distance_to(&pose.end_effector)
        );
    }
    if let Some(message) = &state.last_error {
        error!("Backend error: {}", message);
    }
}

fn print_state(reconciler: &StateReconciler, connection: &ConnectionManager) {
    let state = reconciler.state();
    println!("link:        {:?}", connection.state());
    println!("status:      {}", state.status);
    println!("joints:      {:?}", state.current_joint_state);
    println!("reported:    {:?}", state.reported_position);
    println!("last error:  {:?}", state.last_error);
    println!("last sent:   {:?}", state.last_sent_command);
    println!("orientation: {:?}", reconciler.orientation());
}

fn print_pose(reconciler: &StateReconciler) {
    let pose = reconciler.pose();
    let dims = reconciler.dimensions();
    for segment in Segment::ALL {
        let centre = pose.segment_centre(segment, dims);
        println!(
            "{:<16} centre ({:.3}, {:.3}, {:.3})",
            format!("{:?}", segment),
            centre.x,
            centre.y,
            centre.z
        );
    }
    let end = pose.end_effector;
    println!("{:<16} ({:.3}, {:.3}, {:.3})", "EndEffector", end.x, end.y, end.z);
}
