// Highway planner service.
//
// Loads the road map and serves trajectories to the driving simulator over
// a websocket. Usage: highway_planner [config.json]

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use highway_path_planning::messaging::serve;
use highway_path_planning::{HighwayPlanner, PlannerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("highway_path_planning=info,highway_planner=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => PlannerConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration {}", path))?,
        None => PlannerConfig::default(),
    };

    let planner = HighwayPlanner::from_config(&config).with_context(|| {
        format!("failed to load road map {}", config.road.map_file.display())
    })?;
    info!(
        "highway planner ready: {} waypoints, initial lane {}",
        planner.map().len(),
        planner.behavior_state().current_lane.index()
    );

    let address = config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    serve(listener, Arc::new(Mutex::new(planner))).await?;
    Ok(())
}
