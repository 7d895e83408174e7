use proglog_rs::server::LogService;
use proglog_rs::server::grpc::proto;
use proglog_rs::storage::{Config, Log};
use proto::log_server::LogServer;
use std::path::PathBuf;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let log_dir = PathBuf::from("data");
    let log = Arc::new(Log::open(&log_dir, Config::default())?);

    info!(dir = ?log_dir, "log opened");

    let log_service = LogService::new(log);

    let addr = "[::1]:50051".parse()?;
    info!(%addr, "server listening");

    Server::builder()
        .add_service(LogServer::new(log_service))
        .serve(addr)
        .await?;

    Ok(())
}
