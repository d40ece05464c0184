mod handlers;

pub use handlers::schema;
