pub mod config;
mod error;
mod http_layers;
pub mod metrics;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use http_layers::*;
pub use server::{build_state, make_app, make_metrics_app, run_server};
pub use state::ServerState;
