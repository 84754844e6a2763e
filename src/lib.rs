// Loop Contrast - Library root for testing

pub mod config;
pub mod error;
pub mod loadtest;
pub mod metrics;
pub mod middleware;
pub mod offload;
pub mod resmon;
pub mod routes;
pub mod server;
pub mod workload;
