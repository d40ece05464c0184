mod join_request;
mod message;
mod stats;

pub use join_request::*;
pub use message::*;
pub use stats::*;
