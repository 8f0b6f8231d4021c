//! Common types and utilities for the Huawei Cloud APIs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error body returned by the service APIs.
///
/// The services disagree on the shape: VPC and ECS use flat `error_code` /
/// `error_msg`, CCE uses camelCase, and Auto Scaling nests an `error` object.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default, alias = "errorCode")]
    pub error_code: Option<String>,
    #[serde(default, alias = "errorMessage")]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub error: Option<NestedError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NestedError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorResponse {
    pub fn code(&self) -> Option<&str> {
        self.error_code
            .as_deref()
            .or_else(|| self.error.as_ref().and_then(|e| e.code.as_deref()))
    }

    pub fn message(&self) -> Option<&str> {
        self.error_msg
            .as_deref()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.as_deref()))
    }
}

/// Resource tag as the tag APIs transfer it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

pub fn tags_from_map(map: &BTreeMap<String, String>) -> Vec<Tag> {
    map.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

pub fn tags_to_map(tags: Vec<Tag>) -> BTreeMap<String, String> {
    tags.into_iter().map(|t| (t.key, t.value)).collect()
}

/// Body of `POST .../tags/action`
#[derive(Debug, Serialize)]
pub struct TagAction {
    pub action: &'static str,
    pub tags: Vec<Tag>,
}

impl TagAction {
    pub fn create(tags: &BTreeMap<String, String>) -> Self {
        Self {
            action: "create",
            tags: tags_from_map(tags),
        }
    }

    pub fn delete(tags: &BTreeMap<String, String>) -> Self {
        Self {
            action: "delete",
            tags: tags_from_map(tags),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect();
        format!("?{}", pairs.join("&"))
    }
}
