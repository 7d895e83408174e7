pub mod grpc;

pub use grpc::LogService;
