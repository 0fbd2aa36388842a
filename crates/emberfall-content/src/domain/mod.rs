//! Domain model for the Content Authoring context.

pub mod campaign;
pub mod validation;

pub use campaign::{Campaign, CampaignDocument, ContentError, DocumentFormat};
pub use validation::ContentIssue;
