pub mod handlers;
pub mod requests;
pub mod responses;
pub mod routes;

pub use handlers::error_response;
pub use routes::{create_router, AppState};
