//! REST gateway: routes, DTOs, configuration, and OpenAPI documentation.

pub mod client_ip;
pub mod config;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
