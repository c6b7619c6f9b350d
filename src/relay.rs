//! Attachment relay.
//!
//! Small text attachments are decoded and moved to a secret gist so the
//! dispatched report only carries a link. A failed upload never fails the
//! report: the content is dropped and an error marker travels with it instead.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{info, warn};

use crate::model::{AttachmentRef, SanitizedAttachment};
use crate::upstream::gist::{GistClient, RelayError};

/// What became of a report's attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Stored externally; the report carries this reference.
    Stored(AttachmentRef),
    /// Not stored; the report carries this message.
    Failed(String),
    /// Not attempted (dry run).
    Skipped,
}

/// Relays attachments to the paste store.
#[derive(Clone)]
pub struct AttachmentRelay {
    store: GistClient,
    dry_run: bool,
}

impl AttachmentRelay {
    pub fn new(store: GistClient, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    /// Upload `attachment` for the report titled `title`.
    pub async fn relay(&self, title: &str, attachment: &SanitizedAttachment) -> RelayOutcome {
        if self.dry_run {
            info!(filename = %attachment.filename, "Dry run: skipping attachment upload");
            return RelayOutcome::Skipped;
        }

        match self.upload(title, attachment).await {
            Ok(url) => {
                info!(
                    filename = %attachment.filename,
                    size = attachment.size,
                    "Attachment stored"
                );
                RelayOutcome::Stored(AttachmentRef {
                    url,
                    filename: attachment.filename.clone(),
                    size: attachment.size,
                })
            }
            Err(e) => {
                warn!(
                    filename = %attachment.filename,
                    error = %e,
                    "Attachment upload failed, continuing without it"
                );
                RelayOutcome::Failed(e.to_string())
            }
        }
    }

    async fn upload(&self, title: &str, attachment: &SanitizedAttachment) -> Result<String, RelayError> {
        let content = decode_text(&attachment.content)?;
        let description = format!("Attachment for bug report: {title}");
        self.store
            .create_secret_gist(&description, &attachment.filename, content)
            .await
    }
}

/// Decode base64 attachment content into text, ignoring embedded whitespace.
pub fn decode_text(encoded: &str) -> Result<String, RelayError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
