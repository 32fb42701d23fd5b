//! `spo-graph` HTTP service entry point.

// crates.io
use color_eyre::eyre;
use spo_graph::{
	config::Settings,
	obs,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> eyre::Result<()> {
	color_eyre::install()?;

	let settings = Settings::load()?;

	obs::init_subscriber(&settings.log.filter);
	tracing::info!(settings = ?settings.graph_api, "starting spo-graph");

	let store = settings.token_store()?;
	let graph = settings.graph_api.graph_client(store)?;

	server::bind_and_serve(settings.server.bind_addr, AppState::new(graph), shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if tokio::signal::ctrl_c().await.is_ok() {
		tracing::info!("shutdown signal received");
	}
}
