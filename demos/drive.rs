//! Drive the robot in a slow circle for ten seconds.
//!
//! Run with: `cargo run --example drive`

use std::time::Duration;

use botlink::{BtleplugCentral, CommandPump, InputCell, LinkConfig, MotionSample, RobotLink};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "botlink=debug".into()),
        )
        .init();

    let central = BtleplugCentral::new().await?;
    let config = LinkConfig::default();
    let send_period = config.send_period;
    let link = RobotLink::start(central, config).await?;

    println!("Searching for the robot; state: {}", link.state());

    let inputs = InputCell::new();
    let pump = CommandPump::start(link.handle(), inputs.clone(), send_period);

    // Sweep the drive vector through a full circle at half throttle, sampling
    // input far faster than the pump sends.
    let mut angle = 0.0f32;
    for _ in 0..1_000 {
        inputs.set_movement(MotionSample::new(angle, 25.0));
        angle = (angle + 0.36) % 360.0;
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Back to neutral before tearing down.
    inputs.set_movement(MotionSample::neutral());
    tokio::time::sleep(send_period * 2).await;

    pump.stop().await;
    link.shutdown().await;
    println!("Done");
    Ok(())
}
