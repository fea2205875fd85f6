pub mod otlp;
pub mod pipeline;
pub mod server;
pub mod transform;

pub use pipeline::Pipeline;
pub use server::run_ingest_servers;
