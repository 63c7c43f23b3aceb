//! Training portal aggregate.
//!
//! The shared `TrainingPortal` resource: access credentials plus the list of
//! registered workshops. Decoding is strict about the member list this tool
//! modifies and lossless about everything else, at every nesting level.

use serde::{Deserialize, Serialize};

use crate::core::constants;
use crate::core::domain::ObjectMeta;
use crate::core::types::{DurationSpec, ResourceName};

type Extra = serde_json::Map<String, serde_json::Value>;

/// A registered workshop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalMember {
    pub name: ResourceName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DurationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphaned: Option<DurationSpec>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PortalMember {
    pub fn new(
        name: impl Into<ResourceName>,
        expires: impl Into<DurationSpec>,
        orphaned: impl Into<DurationSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            expires: Some(expires.into()),
            orphaned: Some(orphaned.into()),
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sessions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Updates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<WorkshopDefaults>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// `spec.portal`: access policy and credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updates: Option<Updates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<Sessions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop: Option<DefaultsBlock>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl PortalSettings {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSpec {
    #[serde(default, skip_serializing_if = "PortalSettings::is_empty")]
    pub portal: PortalSettings,
    #[serde(default)]
    pub workshops: Vec<PortalMember>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The portal aggregate as stored in the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalAggregate {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: PortalSpec,
}

impl PortalAggregate {
    /// A fresh portal with anonymous registration, one session per user,
    /// nothing reserved, and no members.
    pub fn new(name: impl Into<ResourceName>, password: String) -> Self {
        Self {
            api_version: constants::API_VERSION.to_string(),
            kind: constants::PORTAL_KIND.to_string(),
            metadata: ObjectMeta::named(name),
            spec: PortalSpec {
                portal: PortalSettings {
                    password: Some(password),
                    registration: Some(Registration {
                        kind: Some("anonymous".to_string()),
                        enabled: Some(true),
                        extra: Extra::new(),
                    }),
                    updates: Some(Updates {
                        workshop: Some(true),
                        extra: Extra::new(),
                    }),
                    sessions: Some(Sessions {
                        maximum: Some(1),
                        extra: Extra::new(),
                    }),
                    workshop: Some(DefaultsBlock {
                        defaults: Some(WorkshopDefaults {
                            reserved: Some(0),
                            extra: Extra::new(),
                        }),
                        extra: Extra::new(),
                    }),
                    extra: Extra::new(),
                },
                workshops: Vec::new(),
                extra: Extra::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn password(&self) -> Option<&str> {
        self.spec.portal.password.as_deref()
    }

    pub fn members(&self) -> &[PortalMember] {
        &self.spec.workshops
    }

    pub fn members_mut(&mut self) -> &mut Vec<PortalMember> {
        &mut self.spec.workshops
    }

    /// Decode from the cluster representation.
    ///
    /// Fails on a wrong type tag or a member entry that is not a mapping
    /// with a `name`.
    pub fn from_resource(value: serde_json::Value) -> Result<Self, String> {
        let aggregate: Self = serde_json::from_value(value).map_err(|e| e.to_string())?;
        if aggregate.api_version != constants::API_VERSION
            || aggregate.kind != constants::PORTAL_KIND
        {
            return Err(format!(
                "expected {}/{}, found {}/{}",
                constants::API_VERSION,
                constants::PORTAL_KIND,
                aggregate.api_version,
                aggregate.kind
            ));
        }
        if let Some(member) = aggregate.members().iter().find(|m| m.name.is_empty()) {
            return Err(format!("workshop entry without a name: {:?}", member));
        }
        Ok(aggregate)
    }

    /// Encode for the cluster.
    pub fn to_resource(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
