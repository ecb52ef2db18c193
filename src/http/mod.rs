//! HTTP surface: router assembly and operational endpoints

mod routes;

pub use routes::build_router;
