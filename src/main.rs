//! scenecast-server - scene-state bridge
//!
//! Reads a JSON `BridgeConfig` from the file named by `SCENECAST_CONFIG`
//! (defaults otherwise) and serves until Ctrl-C.

use std::path::PathBuf;
use std::process::ExitCode;

use scenecast::core::logging;
use scenecast_bridge::{BridgeConfig, BridgeError, BridgeServer};

/// Environment variable naming the config file
const CONFIG_ENV: &str = "SCENECAST_CONFIG";

fn load_config() -> Result<BridgeConfig, BridgeError> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            log::info!("Loading config from: {}", path.display());
            BridgeConfig::load(&path)
        }
        None => Ok(BridgeConfig::default()),
    }
}

fn main() -> ExitCode {
    logging::init();
    log::info!("scenecast-server starting...");

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async {
        let server = match BridgeServer::start(config).await {
            Ok(server) => server,
            Err(e) => {
                log::error!("Failed to start bridge: {}", e);
                return ExitCode::FAILURE;
            }
        };

        println!("control_url={}", server.handshake().control_url);
        println!("web_url={}", server.handshake().web_url);

        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
        }
        log::info!("Shutting down");
        server.shutdown();
        server.join().await;
        ExitCode::SUCCESS
    })
}
