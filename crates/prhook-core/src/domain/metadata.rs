//! Ordered name/value metadata describing a resolved version.

use serde::{Deserialize, Serialize};

use super::pull_request::PullRequest;
use super::version::Version;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataField {
    pub name: String,
    pub value: String,
}

impl MetadataField {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Metadata in emission order. Serialises as a plain JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Metadata(pub Vec<MetadataField>);

impl Metadata {
    /// Describe `version` using the live `pull` for names and the base side.
    ///
    /// `head_sha` is always the version's pinned commit.
    pub fn describe(pull: &PullRequest, version: &Version) -> Self {
        Self(vec![
            MetadataField::new("pr", pull.number.to_string()),
            MetadataField::new("url", pull.html_url.clone()),
            MetadataField::new("head_name", pull.head.ref_name.clone()),
            MetadataField::new("head_sha", version.commit.clone()),
            MetadataField::new("base_name", pull.base.ref_name.clone()),
            MetadataField::new("base_sha", pull.base.sha.clone()),
            MetadataField::new("comment", version.comment.clone()),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
