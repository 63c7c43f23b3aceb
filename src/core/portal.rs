//! Training portal reconciliation.
//!
//! Registers workshops with the shared `TrainingPortal` resource. The
//! portal is created on first use with a generated password; afterwards
//! only its member list changes, and a workshop already listed is left
//! exactly as it is.

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use crate::core::constants;
use crate::core::domain::{PortalAggregate, PortalMember, WorkshopDescriptor};
use crate::core::remote::{CustomResource, ObjectStore};
use crate::error::{Error, RemoteError, Result, ValidationError};

/// What a reconcile did to the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalOutcome {
    /// The portal did not exist and was created with the workshop as a member.
    Created,
    /// The workshop was appended to an existing portal.
    Added,
    /// The workshop was already a member; nothing was written.
    Unchanged,
}

/// Generate a portal password.
pub fn generate_password<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(constants::PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Parse a Go-style duration such as `1h30m`, `90s`, `1.5h` or `250ms`.
pub fn parse_duration(spec: &str) -> Option<Duration> {
    let mut rest = spec.trim();
    if rest.is_empty() {
        return None;
    }
    if rest == "0" {
        return Some(Duration::ZERO);
    }

    let mut nanos = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        nanos += value * unit;
    }
    Some(Duration::from_nanos(nanos.round() as u64))
}

/// Session expiry for a member: the declared duration if it parses, else the default.
pub fn member_expiry(duration: Option<&str>) -> String {
    match duration {
        Some(spec) if parse_duration(spec).is_some() => spec.trim().to_string(),
        _ => constants::DEFAULT_EXPIRES.to_string(),
    }
}

/// Append `identity` to `members` unless already present.
///
/// Returns whether the list changed. An existing entry is never modified.
pub fn merge_member(members: &mut Vec<PortalMember>, identity: &str, duration: Option<&str>) -> bool {
    if members.iter().any(|m| m.name == identity) {
        return false;
    }
    members.push(PortalMember::new(
        identity,
        member_expiry(duration),
        constants::DEFAULT_ORPHANED,
    ));
    true
}

/// Create-or-update of portal aggregates in one object store.
pub struct TrainingPortalReconciler<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> TrainingPortalReconciler<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    fn resource(portal: &str) -> String {
        format!("trainingportal/{}", portal)
    }

    /// Attach the portal identity to a failed remote call.
    fn remote(portal: &str, operation: &str, err: Error) -> Error {
        RemoteError::new(operation, Self::resource(portal), err.to_string()).into()
    }

    fn fetch(&self, portal: &str) -> Result<Option<PortalAggregate>> {
        let Some(value) = self
            .store
            .get_custom(CustomResource::TrainingPortals, portal)
            .map_err(|e| Self::remote(portal, "get", e))?
        else {
            return Ok(None);
        };
        let aggregate =
            PortalAggregate::from_resource(value).map_err(|reason| ValidationError::Malformed {
                resource: Self::resource(portal),
                reason,
            })?;
        Ok(Some(aggregate))
    }

    fn encode(portal: &PortalAggregate) -> Result<serde_json::Value> {
        portal
            .to_resource()
            .map_err(|e| Self::remote(portal.name(), "encode", Error::Other(e.to_string())))
    }

    /// Register `descriptor` with its portal, creating the portal if absent.
    ///
    /// `rng` is only drawn from when the portal is created.
    ///
    /// # Errors
    ///
    /// - `RemoteError` naming the portal if the store read or write fails
    /// - `ValidationError::Malformed` if the existing portal cannot be decoded
    pub fn reconcile<R: Rng + ?Sized>(
        &self,
        descriptor: &WorkshopDescriptor,
        rng: &mut R,
    ) -> Result<PortalOutcome> {
        let name = descriptor.portal.as_str();
        let duration = descriptor.duration.as_deref();

        match self.fetch(name)? {
            None => {
                let mut portal = PortalAggregate::new(name, generate_password(rng));
                merge_member(portal.members_mut(), &descriptor.name, duration);
                self.store
                    .create_custom(
                        CustomResource::TrainingPortals,
                        &Self::encode(&portal)?,
                        constants::FIELD_MANAGER,
                    )
                    .map_err(|e| Self::remote(name, "create", e))?;
                info!(portal = name, workshop = %descriptor.name, "created training portal");
                Ok(PortalOutcome::Created)
            }
            Some(mut portal) => {
                if !merge_member(portal.members_mut(), &descriptor.name, duration) {
                    debug!(portal = name, workshop = %descriptor.name, "already registered");
                    return Ok(PortalOutcome::Unchanged);
                }
                self.store
                    .update_custom(
                        CustomResource::TrainingPortals,
                        &Self::encode(&portal)?,
                        constants::FIELD_MANAGER,
                    )
                    .map_err(|e| Self::remote(name, "update", e))?;
                info!(portal = name, workshop = %descriptor.name, "registered workshop");
                Ok(PortalOutcome::Added)
            }
        }
    }

    /// Drop `identity` from `portal`'s member list.
    ///
    /// Returns whether a member was removed; an absent portal or member is
    /// not an error.
    pub fn remove(&self, portal: &str, identity: &str) -> Result<bool> {
        let Some(mut aggregate) = self.fetch(portal)? else {
            debug!(portal, "portal absent, nothing to remove");
            return Ok(false);
        };

        let before = aggregate.members().len();
        aggregate.members_mut().retain(|m| m.name != identity);
        if aggregate.members().len() == before {
            return Ok(false);
        }

        self.store
            .update_custom(
                CustomResource::TrainingPortals,
                &Self::encode(&aggregate)?,
                constants::FIELD_MANAGER,
            )
            .map_err(|e| Self::remote(portal, "update", e))?;
        info!(portal, workshop = identity, "unregistered workshop");
        Ok(true)
    }

    /// Password of an existing portal.
    pub fn password(&self, portal: &str) -> Result<Option<String>> {
        Ok(self
            .fetch(portal)?
            .and_then(|p| p.password().map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::remote::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn descriptor(name: &str, duration: Option<&str>) -> WorkshopDescriptor {
        let doc = format!(
            "apiVersion: training.educates.dev/v1beta1\nkind: Workshop\nmetadata:\n  name: {}\n{}",
            name,
            duration
                .map(|d| format!("spec:\n  duration: {}\n", d))
                .unwrap_or_default()
        );
        WorkshopDescriptor::decode(doc.as_bytes()).unwrap()
    }

    fn stored(store: &MemoryStore) -> PortalAggregate {
        let value = store
            .custom(CustomResource::TrainingPortals, constants::DEFAULT_PORTAL)
            .unwrap();
        PortalAggregate::from_resource(value).unwrap()
    }

    #[test]
    fn test_create_path_for_first_workshop() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(7);

        let outcome = TrainingPortalReconciler::new(&store)
            .reconcile(&descriptor("ws-1", None), &mut rng)
            .unwrap();

        assert_eq!(outcome, PortalOutcome::Created);
        let portal = stored(&store);
        assert_eq!(
            portal.members(),
            &[PortalMember::new("ws-1", "60m", "15m")]
        );
        assert_eq!(portal.password().unwrap().len(), constants::PASSWORD_LENGTH);
        assert_eq!(store.count("create_custom"), 1);
    }

    #[test]
    fn test_second_merge_is_a_no_op() {
        let store = MemoryStore::new();
        let mut rng = StdRng::seed_from_u64(7);
        let reconciler = TrainingPortalReconciler::new(&store);
        let ws = descriptor("ws-1", Some("30m"));

        reconciler.reconcile(&ws, &mut rng).unwrap();
        let first = stored(&store);
        let outcome = reconciler.reconcile(&ws, &mut rng).unwrap();

        assert_eq!(outcome, PortalOutcome::Unchanged);
        assert_eq!(stored(&store), first);
        assert_eq!(store.count("update_custom"), 0);
    }

    #[test]
    fn test_password_survives_updates() {
        let store = MemoryStore::new();
        let reconciler = TrainingPortalReconciler::new(&store);

        reconciler
            .reconcile(&descriptor("ws-1", None), &mut StdRng::seed_from_u64(1))
            .unwrap();
        let password = stored(&store).password().unwrap().to_string();
        reconciler
            .reconcile(&descriptor("ws-2", None), &mut StdRng::seed_from_u64(2))
            .unwrap();

        let portal = stored(&store);
        assert_eq!(portal.password(), Some(password.as_str()));
        let names: Vec<_> = portal.members().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["ws-1", "ws-2"]);
    }

    #[test]
    fn test_update_keeps_settings_of_user_authored_portal() {
        let store = MemoryStore::new();
        store.insert_custom(
            CustomResource::TrainingPortals,
            serde_json::json!({
                "apiVersion": "training.educates.dev/v1beta1",
                "kind": "TrainingPortal",
                "metadata": {"name": "educates-cli"},
                "spec": {
                    "portal": {
                        "registration": {"type": "anonymous"},
                        "sessions": {"maximum": 1, "registered": 5},
                        "workshop": {"defaults": {"reserved": 0, "capacity": 7}}
                    },
                    "workshops": [{"name": "ws-1"}]
                }
            }),
        );

        let outcome = TrainingPortalReconciler::new(&store)
            .reconcile(&descriptor("ws-2", None), &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(outcome, PortalOutcome::Added);
        let value = store
            .custom(CustomResource::TrainingPortals, constants::DEFAULT_PORTAL)
            .unwrap();
        let settings = &value["spec"]["portal"];
        assert_eq!(settings["sessions"]["registered"], 5);
        assert_eq!(settings["workshop"]["defaults"]["capacity"], 7);
        assert_eq!(settings["registration"], serde_json::json!({"type": "anonymous"}));
        assert!(settings.get("password").is_none());
        assert_eq!(value["spec"]["workshops"][0], serde_json::json!({"name": "ws-1"}));
        assert_eq!(value["spec"]["workshops"][1]["name"], "ws-2");
    }

    #[test]
    fn test_malformed_portal_aborts() {
        let store = MemoryStore::new();
        store.insert_custom(
            CustomResource::TrainingPortals,
            serde_json::json!({
                "apiVersion": "training.educates.dev/v1beta1",
                "kind": "TrainingPortal",
                "metadata": {"name": "educates-cli"},
                "spec": {"portal": {}, "workshops": ["not-a-mapping"]}
            }),
        );

        let err = TrainingPortalReconciler::new(&store)
            .reconcile(&descriptor("ws-1", None), &mut StdRng::seed_from_u64(1))
            .unwrap_err();

        assert!(matches!(err, Error::Validation(ValidationError::Malformed { .. })));
        assert_eq!(store.count("update_custom"), 0);
    }

    #[test]
    fn test_remote_failure_names_portal() {
        let store = MemoryStore::new();
        store.fail_on("create_custom");

        let err = TrainingPortalReconciler::new(&store)
            .reconcile(&descriptor("ws-1", None), &mut StdRng::seed_from_u64(1))
            .unwrap_err();

        match err {
            Error::Remote(remote) => {
                assert_eq!(remote.operation, "create");
                assert_eq!(remote.resource, "trainingportal/educates-cli");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remove_member() {
        let store = MemoryStore::new();
        let reconciler = TrainingPortalReconciler::new(&store);
        let mut rng = StdRng::seed_from_u64(3);
        reconciler.reconcile(&descriptor("ws-1", None), &mut rng).unwrap();
        reconciler.reconcile(&descriptor("ws-2", None), &mut rng).unwrap();

        assert!(reconciler.remove(constants::DEFAULT_PORTAL, "ws-1").unwrap());
        assert!(!reconciler.remove(constants::DEFAULT_PORTAL, "ws-1").unwrap());
        assert!(!reconciler.remove("missing", "ws-2").unwrap());

        let names: Vec<_> = stored(&store)
            .members()
            .iter()
            .map(|m| m.name.clone())
            .collect();
        assert_eq!(names, ["ws-2"]);
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("45m"), Some(Duration::from_secs(2700)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("0"), Some(Duration::ZERO));
        assert_eq!(parse_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("10"), None);
        assert_eq!(parse_duration("ten minutes"), None);
        assert_eq!(parse_duration("5d"), None);
    }

    #[test]
    fn test_unparseable_duration_defaults() {
        assert_eq!(member_expiry(Some("forever")), "60m");
        assert_eq!(member_expiry(None), "60m");
        assert_eq!(member_expiry(Some("2h")), "2h");
    }

    #[test]
    fn test_password_alphabet() {
        let password = generate_password(&mut StdRng::seed_from_u64(42));
        assert_eq!(password.len(), 12);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(password, generate_password(&mut StdRng::seed_from_u64(42)));
    }
}
