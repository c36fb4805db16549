//! # Runtime
//!
//! Process wiring around the reconciler:
//!
//! - `initialization`: tracing, metrics, HTTP server, client and startup resource summary
//! - `watch_loop`: the kube-runtime controller stream and its restart loop
//! - `error_policy`: backoff for failed passes and watch stream errors

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
