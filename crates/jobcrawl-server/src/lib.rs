//! REST API server: routes, DTOs, and error mapping over a [`CrawlService`].
//!
//! [`CrawlService`]: jobcrawl_core::CrawlService

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;
