pub mod audit;
pub mod demos;
pub mod draw;
pub mod error;
pub mod handlers;
pub mod members;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
