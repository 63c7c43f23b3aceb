//! Deploying workshops into a cluster.

use rand::Rng;
use tracing::info;

use crate::core::constants;
use crate::core::domain::WorkshopDescriptor;
use crate::core::portal::{PortalOutcome, TrainingPortalReconciler};
use crate::core::remote::{CustomResource, ObjectStore};
use crate::error::{RemoteError, Result};

/// Apply the `Workshop` resource, then register it with its portal.
///
/// Re-deploying an unchanged workshop re-applies the resource and leaves
/// the portal untouched.
pub fn deploy<R: Rng + ?Sized>(
    store: &dyn ObjectStore,
    descriptor: &WorkshopDescriptor,
    rng: &mut R,
) -> Result<PortalOutcome> {
    store
        .apply_custom(
            CustomResource::Workshops,
            &descriptor.to_resource(),
            constants::FIELD_MANAGER,
        )
        .map_err(|e| {
            RemoteError::new("apply", format!("workshop/{}", descriptor.name), e.to_string())
        })?;
    info!(workshop = %descriptor.name, "applied workshop");

    TrainingPortalReconciler::new(store).reconcile(descriptor, rng)
}

/// Unregister a workshop from its portal and delete its resource.
///
/// Returns whether the resource existed.
pub fn delete(store: &dyn ObjectStore, descriptor: &WorkshopDescriptor) -> Result<bool> {
    TrainingPortalReconciler::new(store).remove(&descriptor.portal, &descriptor.name)?;

    let existed = store
        .delete_custom(CustomResource::Workshops, &descriptor.name)
        .map_err(|e| {
            RemoteError::new("delete", format!("workshop/{}", descriptor.name), e.to_string())
        })?;
    if existed {
        info!(workshop = %descriptor.name, "deleted workshop");
    }
    Ok(existed)
}
