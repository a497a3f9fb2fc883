//! Development server for laboratory UI development
//!
//! Runs the mock laboratory API on the system clock, seeds it with the
//! development dataset, and keeps batch jobs moving so report screens have
//! something to poll.
//!
//! Usage: cargo run -p dev-server
//!
//! `IP_ADDRESS`, `PORT` and `ALLOWED_ORIGINS` are read from the environment
//! or a `.env` file, as for the real server.

use anyhow::Result;
use mock_api::{
    Config,
    telemetry::{get_subscriber, init_subscriber},
    time::TimeSource,
};
use std::time::Duration;
use test_helpers::{TestApp, mock::DevDataset};
use tokio::time::interval;
use tracing::info;

/// How often the fake job runner steps batch jobs along.
const BATCH_JOB_TICK: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_subscriber(get_subscriber("info".into()))?;

    let config = Config::from_env()?;
    info!("Starting laboratory development server");
    let app = test_helpers::spawn_app_with_config(config, TimeSource::System)
        .await;

    info!("Seeding development data");
    let dataset = DevDataset::create(&app).await?;
    info!(
        test_configs = dataset.test_configs.len(),
        reports = dataset.reports.len(),
        worksheet = %dataset.worksheet.worksheet_no,
        "development data ready"
    );

    start_batch_job_runner(&app);

    info!("API: http://127.0.0.1:{}/ws/rest/v1", app.port);
    info!(
        "UI:  cd ui && BACKEND_URL=http://127.0.0.1:{} trunk serve",
        app.port
    );
    info!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down development server");
    Ok(())
}

/// Step batch jobs on a timer so pending reports start and finish.
fn start_batch_job_runner(app: &TestApp) {
    let store = app.store.clone();
    tokio::spawn(async move {
        let mut interval = interval(BATCH_JOB_TICK);
        loop {
            interval.tick().await;
            let now = store.time.now();
            store.lock().advance_batch_jobs(now);
        }
    });
}
