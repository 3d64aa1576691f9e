pub mod handlers;
pub mod models;
pub mod routes;
pub mod websocket;

pub use routes::create_api_router;
