// Database access layer: connection pool and aggregate repositories

pub mod pool;
pub mod repositories;

pub use pool::DbPool;
