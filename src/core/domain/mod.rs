//! Domain types.

mod meta;
pub mod portal;
pub mod secret;
mod sync;
pub mod workshop;

pub use meta::ObjectMeta;
pub use portal::{PortalAggregate, PortalMember};
pub use secret::{SecretBytes, SecretKind, SecretManifest, SecretRecord};
pub use sync::SyncReport;
pub use workshop::{DescriptorProblem, WorkshopDescriptor};
