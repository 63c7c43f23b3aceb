//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// A resource identity (secret, workshop, or portal name).
///
/// Must pass `validation::validate_name` before it is written anywhere.
pub type ResourceName = String;

/// An ingress wildcard domain (e.g., `192-168-1-10.nip.io`).
pub type Domain = String;

/// A workshop source location: a filesystem path or an http(s) URL.
pub type Location = String;

/// A Go-style duration string (e.g., `60m`, `1h30m`).
pub type DurationSpec = String;
