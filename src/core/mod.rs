//! Core library components.
//!
//! The reconciliation logic: configuration resolution, the secrets cache,
//! workshop loading, portal reconciliation and the bootstrap pipeline, plus
//! the interfaces onto the external systems they drive.

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod domain;
pub mod platform;
pub mod portal;
pub mod process;
pub mod remote;
pub mod secrets;
pub mod types;
pub mod validation;
pub mod workshop;
