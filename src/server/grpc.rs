//! gRPC transport for `Log`, generated from `proto/log.proto`. Every
//! RPC wraps a blocking storage call in `spawn_blocking` since `Log`'s
//! internal `RwLock` is a std sync lock, not a tokio one.

use crate::errors::LogError;
use crate::storage::Log;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};
use tracing::instrument;

/// Re-exports the generated `log.v1` types. The module is only
/// compiled once, in `storage::record`, since `Segment`/`Log` need
/// `Record` there; generating it a second time here would produce a
/// second, incompatible `Record` type.
pub mod proto {
    pub use crate::storage::record::*;
}

use proto::{ConsumeRequest, ConsumeResponse, ProduceRequest, ProduceResponse, Record};

trait IntoStatus {
    fn into_status(self) -> Status;
}

impl IntoStatus for LogError {
    fn into_status(self) -> Status {
        match &self {
            LogError::OffsetOutOfRange { offset, .. } => {
                Status::not_found(format!("offset {offset} not found"))
            }
            LogError::Segment(e) => Status::internal(format!("segment error: {e}")),
            LogError::DirectoryError { .. } => Status::internal(self.to_string()),
        }
    }
}

fn join_failed(e: tokio::task::JoinError) -> Status {
    Status::internal(format!("blocking task failed: {e}"))
}

pub struct LogService {
    log: Arc<Log>,
}

impl LogService {
    pub fn new(log: Arc<Log>) -> Self {
        Self { log }
    }
}

type ConsumeStreamOutput = Pin<Box<dyn Stream<Item = Result<ConsumeResponse, Status>> + Send>>;
type ProduceStreamOutput = Pin<Box<dyn Stream<Item = Result<ProduceResponse, Status>> + Send>>;

#[tonic::async_trait]
impl proto::log_server::Log for LogService {
    #[instrument(skip(self, request))]
    async fn produce(
        &self,
        request: Request<ProduceRequest>,
    ) -> Result<Response<ProduceResponse>, Status> {
        let record = request
            .into_inner()
            .record
            .ok_or_else(|| Status::invalid_argument("missing record"))?;
        let log = Arc::clone(&self.log);

        let offset = tokio::task::spawn_blocking(move || log.append(record))
            .await
            .map_err(join_failed)?
            .map_err(IntoStatus::into_status)?;

        Ok(Response::new(ProduceResponse { offset }))
    }

    #[instrument(skip(self, request))]
    async fn consume(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<ConsumeResponse>, Status> {
        let offset = request.into_inner().offset;
        let log = Arc::clone(&self.log);

        let record = tokio::task::spawn_blocking(move || log.read(offset))
            .await
            .map_err(join_failed)?
            .map_err(IntoStatus::into_status)?;

        Ok(Response::new(ConsumeResponse {
            record: Some(record),
        }))
    }

    type ConsumeStreamStream = ConsumeStreamOutput;

    #[instrument(skip(self, request))]
    async fn consume_stream(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<Self::ConsumeStreamStream>, Status> {
        let mut offset = request.into_inner().offset;
        let log = Arc::clone(&self.log);

        let stream = async_stream::try_stream! {
            loop {
                let log = Arc::clone(&log);
                let current = offset;
                let record = tokio::task::spawn_blocking(move || log.read(current))
                    .await
                    .map_err(join_failed)?;

                match record {
                    Ok(record) => {
                        offset += 1;
                        yield ConsumeResponse { record: Some(record) };
                    }
                    Err(LogError::OffsetOutOfRange { .. }) => break,
                    Err(e) => Err(e.into_status())?,
                }
            }
        };

        Ok(Response::new(Box::pin(stream)))
    }

    type ProduceStreamStream = ProduceStreamOutput;

    #[instrument(skip(self, request))]
    async fn produce_stream(
        &self,
        request: Request<Streaming<ProduceRequest>>,
    ) -> Result<Response<Self::ProduceStreamStream>, Status> {
        let mut incoming = request.into_inner();
        let log = Arc::clone(&self.log);

        let stream = async_stream::try_stream! {
            while let Some(req) = incoming.message().await? {
                let record: Record = req
                    .record
                    .ok_or_else(|| Status::invalid_argument("missing record"))?;
                let log = Arc::clone(&log);

                let offset = tokio::task::spawn_blocking(move || log.append(record))
                    .await
                    .map_err(join_failed)?
                    .map_err(IntoStatus::into_status)?;

                yield ProduceResponse { offset };
            }
        };

        Ok(Response::new(Box::pin(stream)))
    }
}
