//! Inference gateway: forwards prediction requests to a Vertex AI endpoint.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
