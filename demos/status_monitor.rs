//! Print every connection state transition until interrupted.
//!
//! Run with: `cargo run --example status_monitor`

use botlink::{BtleplugCentral, LinkConfig, RobotLink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botlink=info".into()),
        )
        .init();

    let central = BtleplugCentral::new().await?;
    let link = RobotLink::start(central, LinkConfig::default()).await?;

    let mut states = link.watch_state();
    println!("Connection state: {}", *states.borrow());

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("Connection state: {}", *states.borrow());
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted; shutting down");
                break;
            }
        }
    }

    link.shutdown().await;
    Ok(())
}
