pub mod auth;
pub mod consumer;
pub mod workload;
