use std::time::Duration;

use courier::{Courier, Endpoint, Priority};
use tokio::time::sleep;
use tracing::Level;

fn init_logging() {
    tracing_subscriber::fmt()
        // .with_max_level(Level::INFO)
        .with_max_level(Level::DEBUG)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let courier = Courier::builder()
        .with_application_token("token-1234")
        .with_endpoint(Endpoint::tcp("localhost", 7010)?)
        .build()?;

    courier.begin()
        .titled("Deployment")?
        .with_body_args("v{} deployed to {}", &[&"1.2.3", &"production"])
        .with_priority(Priority::Medium)
        .send()?;

    courier.send_high_priority("Database connection lost")?;

    // give the dispatch tasks a chance to finish before the runtime shuts down
    sleep(Duration::from_secs(2)).await;

    Ok(())
}
