//! Loading campaign documents from disk.

use std::path::Path;

use tracing::instrument;

use crate::domain::{Campaign, ContentError, DocumentFormat};

/// Reads, validates and compiles the campaign at `path`. The format is
/// chosen by file extension.
///
/// # Errors
///
/// Returns [`ContentError::Io`] if the file cannot be read, and the
/// errors of [`Campaign::compile`] otherwise.
#[instrument]
pub async fn load_campaign(path: &Path) -> Result<Campaign, ContentError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let format = DocumentFormat::from_extension(extension)?;
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
    Campaign::compile(&source, format)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn bundled(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../campaigns")
            .join(name)
    }

    #[tokio::test]
    async fn test_bundled_campaign_loads() {
        // Act
        let campaign = load_campaign(&bundled("ashfall.yaml")).await.unwrap();

        // Assert
        assert_eq!(campaign.id, "ashfall");
        assert!(campaign.graph.contains(campaign.graph.start_node_id()));
        assert!(campaign.camp_table_for(&campaign.starting_location).is_some());
        assert!(campaign.bestiary.contains("bog_lurker"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let result = load_campaign(&bundled("missing.yaml")).await;

        assert!(matches!(result, Err(ContentError::Io { .. })));
    }

    #[tokio::test]
    async fn test_unknown_extension_is_rejected() {
        let result = load_campaign(Path::new("campaign.toml")).await;

        assert!(matches!(result, Err(ContentError::UnsupportedFormat(_))));
    }
}
