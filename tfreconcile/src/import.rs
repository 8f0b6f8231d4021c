//! Import ID parsing
//!
//! An import ID is either the plain remote identifier or a `/`-separated
//! composite whose leading parts fill parent-scoped attributes.

use crate::error::{ReconcileError, Result};
use crate::value::AttributeBag;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// The whole string is the identifier
    Id,
    /// `parent/.../id`. Names the attributes filled by the leading parts
    Composite(&'static [&'static str]),
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::Id => f.write_str("<id>"),
            ImportFormat::Composite(parents) => {
                for parent in parents.iter() {
                    write!(f, "<{}>/", parent)?;
                }
                f.write_str("<id>")
            }
        }
    }
}

/// Result of parsing an import ID
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedImport {
    pub id: String,
    /// Parent-scoped attributes taken from the composite ID
    pub attributes: AttributeBag,
}

impl ImportFormat {
    pub fn parse(&self, raw: &str) -> Result<ParsedImport> {
        let invalid = || ReconcileError::InvalidImportId {
            id: raw.to_string(),
            format: self.to_string(),
        };

        match self {
            ImportFormat::Id => {
                let id = raw.trim();
                if id.is_empty() {
                    return Err(invalid());
                }
                Ok(ParsedImport {
                    id: id.to_string(),
                    attributes: AttributeBag::new(),
                })
            }
            ImportFormat::Composite(parents) => {
                let parts: Vec<&str> = raw.split('/').collect();
                if parts.len() != parents.len() + 1 || parts.iter().any(|p| p.is_empty()) {
                    return Err(invalid());
                }

                let mut attributes = AttributeBag::new();
                for (name, value) in parents.iter().zip(parts.iter()) {
                    attributes.set(name, *value);
                }
                Ok(ParsedImport {
                    id: parts[parents.len()].to_string(),
                    attributes,
                })
            }
        }
    }
}
