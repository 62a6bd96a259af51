use lofi_radio::config::ServerConfig;
use lofi_radio::logging::init_logging;
use lofi_radio::station;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    init_logging();
    let config = ServerConfig::from_env();

    tracing::info!("Starting lofi radio on {}", config.bind_addr());

    if let Err(e) = station::serve(config).await {
        tracing::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
