pub mod attrs;
pub mod grpc;
pub mod http;
