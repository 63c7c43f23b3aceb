//! Workshop descriptor.
//!
//! Typed view of a `Workshop` resource. The full document is kept so that
//! fields this tool does not model are passed through to the cluster as-is.

use serde::{Deserialize, Serialize};

use crate::core::constants;
use crate::core::domain::ObjectMeta;
use crate::core::types::{DurationSpec, Location, ResourceName};

/// The fields of a workshop document this tool reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkshopHeader {
    api_version: String,
    kind: String,
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: WorkshopSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workshop: Option<WorkshopContent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Why a document is not a usable workshop descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorProblem {
    /// Not YAML, or fields of the wrong shape.
    Malformed(String),
    /// apiVersion/kind are not `training.educates.dev/v1beta1` / `Workshop`.
    WrongType { api_version: String, kind: String },
    /// `metadata.name` is missing or empty.
    MissingName,
}

impl std::fmt::Display for DescriptorProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "{}", reason),
            Self::WrongType { api_version, kind } => write!(
                f,
                "expected {}/{}, found {}/{}",
                constants::API_VERSION,
                constants::WORKSHOP_KIND,
                api_version,
                kind
            ),
            Self::MissingName => write!(f, "metadata.name is required"),
        }
    }
}

/// A loaded workshop definition with its resolved identity.
#[derive(Debug, Clone)]
pub struct WorkshopDescriptor {
    /// Final identity in the cluster.
    pub name: ResourceName,
    /// Name declared in the document.
    pub declared_name: String,
    pub duration: Option<DurationSpec>,
    pub image: Option<String>,
    /// Canonical source (`file://` URI or the literal URL).
    pub source: Location,
    /// Portal the workshop is registered with.
    pub portal: ResourceName,
    document: serde_json::Value,
}

impl WorkshopDescriptor {
    /// Decode a document, checking its declared type.
    ///
    /// The identity starts out as the declared name; the loader replaces it.
    pub fn decode(bytes: &[u8]) -> Result<Self, DescriptorProblem> {
        let document: serde_json::Value = serde_yaml::from_slice(bytes)
            .map_err(|e| DescriptorProblem::Malformed(e.to_string()))?;
        let header: WorkshopHeader = serde_json::from_value(document.clone())
            .map_err(|e| DescriptorProblem::Malformed(e.to_string()))?;

        if header.api_version != constants::API_VERSION || header.kind != constants::WORKSHOP_KIND
        {
            return Err(DescriptorProblem::WrongType {
                api_version: header.api_version,
                kind: header.kind,
            });
        }
        if header.metadata.name.is_empty() {
            return Err(DescriptorProblem::MissingName);
        }

        Ok(Self {
            name: header.metadata.name.clone(),
            declared_name: header.metadata.name,
            duration: header.spec.duration,
            image: header.spec.workshop.and_then(|w| w.image),
            source: String::new(),
            portal: constants::DEFAULT_PORTAL.to_string(),
            document,
        })
    }

    /// The resource to write to the cluster: the original document with the
    /// final identity and provenance annotations stamped into its metadata.
    pub fn to_resource(&self) -> serde_json::Value {
        let mut document = self.document.clone();
        if let Some(root) = document.as_object_mut() {
            let metadata = root
                .entry("metadata")
                .or_insert_with(|| serde_json::json!({}));
            if let Some(metadata) = metadata.as_object_mut() {
                metadata.insert("name".to_string(), self.name.clone().into());
                let annotations = metadata
                    .entry("annotations")
                    .or_insert_with(|| serde_json::json!({}));
                if let Some(annotations) = annotations.as_object_mut() {
                    for (key, value) in self.annotations() {
                        annotations.insert(key.to_string(), value.into());
                    }
                }
            }
        }
        document
    }

    /// Provenance annotations.
    pub fn annotations(&self) -> [(&'static str, String); 2] {
        [
            (constants::WORKSHOP_ANNOTATION, self.declared_name.clone()),
            (constants::SOURCE_ANNOTATION, self.source.clone()),
        ]
    }

    /// Image the standalone content container runs.
    pub fn content_image(&self) -> &str {
        self.image
            .as_deref()
            .unwrap_or(constants::WORKSHOP_BASE_IMAGE)
    }
}
