//! Campaign documents and the compiled campaign.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use emberfall_character::domain::Creature;
use emberfall_combat::domain::Bestiary;
use emberfall_core::error::DomainError;
use emberfall_narrative::domain::{CampEventTable, StoryGraph, StoryNode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::validation::{ContentIssue, validate};

/// Errors raised while loading content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The document could not be read.
    #[error("failed to read campaign {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file extension is not a known document format.
    #[error("unsupported campaign format: {0}")]
    UnsupportedFormat(String),

    /// The document did not deserialize.
    #[error("malformed campaign document: {0}")]
    Parse(String),

    /// The document deserialized but references do not line up.
    #[error("campaign failed validation:{}", render_issues(.0))]
    Invalid(Vec<ContentIssue>),
}

fn render_issues(issues: &[ContentIssue]) -> String {
    issues.iter().fold(String::new(), |mut out, issue| {
        let _ = write!(out, "\n  - {issue}");
        out
    })
}

impl From<serde_yaml::Error> for ContentError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<ContentError> for DomainError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Io { .. } => Self::Infrastructure(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

/// Serialization format of a campaign document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.yaml` / `.yml`.
    Yaml,
    /// `.json`.
    Json,
}

impl DocumentFormat {
    /// Picks a format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::UnsupportedFormat`] for anything else.
    pub fn from_extension(extension: &str) -> Result<Self, ContentError> {
        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ContentError::UnsupportedFormat(other.to_owned())),
        }
    }
}

/// A campaign as authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDocument {
    /// Campaign id, stored in saves.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Node a new game begins at.
    pub start_node_id: String,
    /// The only location unlocked at the start.
    pub starting_location: String,
    /// Story nodes.
    pub nodes: Vec<StoryNode>,
    /// Camp and exploration event tables.
    #[serde(default)]
    pub camp_tables: Vec<CampEventTable>,
    /// Creatures added to the built-in bestiary.
    #[serde(default)]
    pub creatures: Vec<Creature>,
}

impl CampaignDocument {
    /// Deserializes a document.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Parse`] for malformed input.
    pub fn parse(source: &str, format: DocumentFormat) -> Result<Self, ContentError> {
        Ok(match format {
            DocumentFormat::Yaml => serde_yaml::from_str(source)?,
            DocumentFormat::Json => serde_json::from_str(source)?,
        })
    }
}

/// A validated campaign ready to play.
#[derive(Debug, Clone)]
pub struct Campaign {
    /// Campaign id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// SHA-256 of the source document, hex encoded.
    pub version_hash: String,
    /// The only location unlocked at the start.
    pub starting_location: String,
    /// Story graph.
    pub graph: StoryGraph,
    /// Event tables keyed by id.
    pub camp_tables: BTreeMap<String, CampEventTable>,
    /// Built-in creatures plus the campaign's own.
    pub bestiary: Bestiary,
}

impl Campaign {
    /// Parses, validates and compiles a document.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Parse`] or [`ContentError::Invalid`].
    pub fn compile(source: &str, format: DocumentFormat) -> Result<Self, ContentError> {
        let document = CampaignDocument::parse(source, format)?;
        let bestiary = Bestiary::standard().with_creatures(document.creatures.clone());
        let issues = validate(&document, &bestiary);
        if !issues.is_empty() {
            return Err(ContentError::Invalid(issues));
        }

        let version_hash = version_hash(source);
        tracing::info!(
            campaign = %document.id,
            nodes = document.nodes.len(),
            %version_hash,
            "campaign compiled"
        );
        Ok(Self {
            id: document.id,
            title: document.title,
            version_hash,
            starting_location: document.starting_location,
            graph: StoryGraph::new(&document.start_node_id, document.nodes),
            camp_tables: document
                .camp_tables
                .into_iter()
                .map(|t| (t.id.clone(), t))
                .collect(),
            bestiary,
        })
    }

    /// An event table by id.
    #[must_use]
    pub fn table(&self, table_id: &str) -> Option<&CampEventTable> {
        self.camp_tables.get(table_id)
    }

    /// The camp table for a location, if one is declared.
    #[must_use]
    pub fn camp_table_for(&self, location_id: &str) -> Option<&CampEventTable> {
        self.camp_tables
            .values()
            .find(|t| t.location_id.as_deref() == Some(location_id))
    }
}

/// SHA-256 of `source`, hex encoded.
#[must_use]
pub fn version_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r"
id: trial
title: Trial
startNodeId: start
startingLocation: village
nodes:
  - id: start
    description: It begins.
    choices:
      - id: go
        text: Go
        outcome: { type: goto, nodeId: end }
  - id: end
    description: It ends.
";

    #[test]
    fn test_compile_minimal_yaml() {
        let campaign = Campaign::compile(MINIMAL, DocumentFormat::Yaml).unwrap();

        assert_eq!(campaign.id, "trial");
        assert_eq!(campaign.graph.start_node_id(), "start");
        assert!(campaign.graph.contains("end"));
        assert_eq!(campaign.version_hash.len(), 64);
        assert!(campaign.bestiary.contains("goblin"));
    }

    #[test]
    fn test_version_hash_tracks_source() {
        assert_eq!(version_hash("a"), version_hash("a"));
        assert_ne!(version_hash("a"), version_hash("b"));
        assert_eq!(
            version_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("YML").unwrap(), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_extension("json").unwrap(), DocumentFormat::Json);
        assert!(matches!(
            DocumentFormat::from_extension("md"),
            Err(ContentError::UnsupportedFormat(ext)) if ext == "md"
        ));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        assert!(matches!(
            Campaign::compile("{", DocumentFormat::Json),
            Err(ContentError::Parse(_))
        ));
    }

    #[test]
    fn test_dangling_goto_fails_validation() {
        let source = MINIMAL.replace("nodeId: end", "nodeId: nowhere");

        let err = Campaign::compile(&source, DocumentFormat::Yaml).unwrap_err();

        assert!(matches!(&err, ContentError::Invalid(issues) if issues.len() == 1));
        assert!(err.to_string().contains("nowhere"));
    }
}
