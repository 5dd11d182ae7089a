mod common;
mod health_service;
mod must_gather_config;
mod must_gather_job;
mod must_gather_service;

pub use common::*;
pub use health_service::*;
pub use must_gather_config::*;
pub use must_gather_job::*;
pub use must_gather_service::*;
