#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

pub mod app;
pub mod config;
pub mod http;
pub mod pipeline_info;
pub mod rest;
