pub mod config;
pub mod episodes;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod ws;

pub use routes::create_router;
pub use ws::WsMessage;
