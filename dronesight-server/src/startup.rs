// Process startup: tracing, shared state and the serve loop

use crate::http::{create_router, AppState};
use crate::session::AnalysisContext;
use dronesight_core::RelayConfig;
use dronesight_eye::{build_detector, DetectionPipeline, ImageDecoder};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` wins over the configured level
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .try_init();
}

/// Construct the detector and everything sessions share
pub fn build_state(config: &RelayConfig) -> dronesight_core::Result<AppState> {
    let detector = build_detector(&config.detector)?;
    let pipeline = DetectionPipeline::from_limits(detector, &config.limits);
    info!(
        "Detector '{}' ready ({} concurrent inferences, timeout {:?})",
        pipeline.detector_name(),
        config.limits.max_concurrent_inferences,
        config.limits.inference_timeout()
    );

    let context = AnalysisContext::from_limits(pipeline, Arc::new(ImageDecoder::new()), &config.limits);
    Ok(AppState::new(context, config.network.analyze_path.clone()))
}

/// Serve the router on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on ws://{}{}", addr, state.analyze_path);
    }

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
