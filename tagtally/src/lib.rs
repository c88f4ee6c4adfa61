pub mod handlers;
pub mod server;
pub mod validation;

// Re-export commonly used pieces for convenience
pub use handlers::AppState;
pub use server::{HttpServer, create_router};
pub use validation::{Validation, validate_input};
