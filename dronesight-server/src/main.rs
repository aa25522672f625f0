// dronesight relay server

use anyhow::Context;
use clap::Parser;
use dronesight_core::{DetectorBackend, RelayConfig};
use dronesight_server::startup;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "dronesight-server")]
#[command(about = "Real-time frame analysis relay: frames in, spatial descriptions out", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON or TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Listening port
    #[arg(long, short)]
    port: Option<u16>,

    /// YOLOv8 ONNX model; selects the onnx backend
    #[arg(long)]
    model: Option<PathBuf>,

    /// Class labels, one per line
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Detector calls allowed in flight
    #[arg(long)]
    max_concurrent_inferences: Option<usize>,

    /// Upper bound on one detector call, in milliseconds
    #[arg(long)]
    inference_timeout_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// File (or defaults), then environment, then flags
    fn load_config(&self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = RelayConfig::from_file(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                config.apply_env();
                config
            }
            None => RelayConfig::from_env(),
        };
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn apply(&self, config: &mut RelayConfig) {
        if let Some(host) = &self.host {
            config.network.bind_address = host.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(model) = &self.model {
            config.detector.model_path = Some(model.clone());
            config.detector.backend = DetectorBackend::Onnx;
        }
        if let Some(labels) = &self.labels {
            config.detector.labels_path = Some(labels.clone());
        }
        if let Some(max) = self.max_concurrent_inferences {
            config.limits.max_concurrent_inferences = max;
        }
        if let Some(timeout) = self.inference_timeout_ms {
            config.limits.inference_timeout_ms = Some(timeout);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    startup::init_tracing(&config.log_level);
    info!("Starting dronesight relay v{}", env!("CARGO_PKG_VERSION"));

    let state = startup::build_state(&config).context("building detector")?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    startup::serve(listener, state, startup::shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}
