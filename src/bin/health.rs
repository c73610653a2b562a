//! Standalone liveness server for deployment platforms.
//!
//! Usage: PORT=10000 cargo run --bin health

use qwen_partner::config::health_port;
use qwen_partner::health;
use tracing::error;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let port = match health_port(|key| std::env::var(key).ok()) {
        Ok(port) => port,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = health::serve(port).await {
        error!("Health server failed: {e}");
        std::process::exit(1);
    }
}
