//! educates-local - Local bootstrap for an Educates training environment.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── config        # View and reset the effective configuration
//! │   ├── cluster       # Create and delete the local environment
//! │   ├── secrets       # Manage the local secrets cache
//! │   ├── workshop      # Deploy, delete and serve workshops
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # Layered configuration resolution
//!     ├── secrets       # File-backed secrets cache and cluster sync
//!     ├── workshop/     # Workshop loading, identity, deploy and serve
//!     ├── portal        # Training portal create-or-merge
//!     ├── bootstrap/    # Ordered, fail-fast environment pipeline
//!     ├── domain/       # Typed resources (secrets, workshops, portals)
//!     ├── remote/       # Object store trait (kubectl, in-memory)
//!     └── platform/     # Cluster, package and container collaborators
//! ```
//!
//! # Features
//!
//! - Deterministic workshop identities derived from their source location
//! - Idempotent portal registration that never regenerates credentials
//! - Push-only secret sync that survives cluster re-creation
//! - Every external system behind a narrow trait

pub mod cli;
pub mod core;
pub mod error;
