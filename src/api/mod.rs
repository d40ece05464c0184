mod auth;
mod request_handler;
mod router;

pub use router::init_router;
