//! Fleetwatch — layered health monitoring for a small fleet of hosts.
//!
//! Probes every host in cost order (HTTP → TCP → remote command), learns
//! per-host timeouts from observed latency history, rate-limits the
//! expensive remote-command layer, and cross-correlates the per-host
//! results into ranked root-cause deductions.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod state;
pub mod store;

pub mod limiter;
pub mod timeout;

pub mod probe;

pub mod deduce;
pub mod evidence;
pub mod pipeline;

pub mod orchestrator;
pub mod report;
