//! Prometheus exporter for the Marzban proxy control plane.
//!
//! This crate polls the Marzban REST API on every scrape and republishes
//! selected fields as Prometheus gauges on an HTTP `/metrics` endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Marzban API    │────>│   Translator    │────>│   HTTP Server   │
//! │  (/api/...)     │     │  (MetricSet)    │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! Nothing is cached between scrapes apart from the session token. A scrape
//! either returns every metric or fails as a whole.
//!
//! # Usage
//!
//! ```bash
//! MARZBAN_URL=https://panel.example.com \
//! MARZBAN_USERNAME=admin MARZBAN_PASSWORD=secret \
//! marzban-exporter
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod client;
pub mod config;
pub mod error;
pub mod exposition;
pub mod http;
pub mod mapping;
pub mod metrics;
pub mod translator;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ControlPlane, MarzbanClient, Resource};
pub use config::ExporterConfig;
pub use error::{AuthError, FetchError};
pub use http::HttpServer;
pub use metrics::MetricSet;
pub use translator::{SharedTranslator, Translator};
