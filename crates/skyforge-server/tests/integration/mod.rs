pub mod api_tests;
pub mod common;
