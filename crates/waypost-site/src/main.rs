mod config;
mod error;
mod guides;
mod model;
mod parser;
mod server;
mod store;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use waypost_common::feed::FeedService;

use config::Config;
use guides::GuideStore;
use store::SubmissionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("starting waypost site server");

    let config = Config::from_env()?;
    info!(
        addr = %config.bind_addr,
        guides_dir = %config.guides_dir.display(),
        contact_file = %config.contact_file.display(),
        itinerary_file = %config.itinerary_file.display(),
        "configuration loaded"
    );

    let state = server::AppState {
        guides: Arc::new(GuideStore::new(&config.guides_dir)),
        contact: Arc::new(SubmissionStore::new(&config.contact_file)),
        itinerary: Arc::new(SubmissionStore::new(&config.itinerary_file)),
        feed: Arc::new(FeedService::from_env()?),
    };

    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
