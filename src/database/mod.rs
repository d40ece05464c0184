mod chat_log_repository;
mod join_request_repository;
mod schema;
mod stats_repository;

pub use chat_log_repository::ChatLogDatabase;
pub use join_request_repository::{JoinRequestDatabase, JoinRequestRepository};
pub use schema::{apply_schema, init_pg_pool};
pub use stats_repository::StatsDatabase;
