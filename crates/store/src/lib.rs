pub mod db;
pub mod logs;
pub mod metrics;
pub mod schema;
mod sql;
pub mod traces;

pub use db::Store;
