pub mod auth;
pub mod client;
pub mod config;
pub mod ports;
pub mod push;
pub mod state;
pub mod store;
pub mod types;

mod adapters;
mod app;
mod assets;
mod site;
mod templates;

pub use app::app;
pub use push::vapid::generate_vapid_credentials;

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, state: state::AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening on http://{addr}");
    axum::serve(listener, app(state)).await
}
