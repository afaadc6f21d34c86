//! JSON-over-HTTPS client for the clinic backend.

pub mod client;

pub use client::RestClient;
