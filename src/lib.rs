//! SQL Instance Controller Library
//!
//! This library provides the core functionality for the SQL Instance Controller:
//! a Kubernetes controller that provisions Cloud SQL PostgreSQL instances by
//! rendering Terraform manifests from `PostgreSql` resources and driving the
//! `terraform` CLI.
//!
//! ## Quick Start
//!
//! ```rust
//! use sql_instance_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod credentials;
pub mod crd;
pub mod manifest;
pub mod observability;
pub mod prelude;
pub mod provisioner;
pub mod runtime;
