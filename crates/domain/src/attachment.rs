// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::error::DomainError;
use crate::validation::validate_file_name;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Metadata for an attachment whose bytes are already stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDraft {
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    /// Key under which the attachment store holds the bytes.
    pub storage_key: String,
    pub description: Option<String>,
    pub uploaded_by: String,
}

/// An attachment owned by a permit. Carries no workflow logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u32,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub storage_key: String,
    pub description: Option<String>,
    pub uploaded_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// The attachments owned by one permit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttachmentLedger {
    attachments: Vec<Attachment>,
    next_id: u32,
}

impl AttachmentLedger {
    /// Rebuilds a ledger from stored attachments.
    ///
    /// `next_id` is the last id handed out; ids are never reused, even
    /// after the attachment that held them is removed.
    #[must_use]
    pub fn restore(attachments: Vec<Attachment>, next_id: u32) -> Self {
        let highest: u32 = attachments.iter().map(|x| x.id).max().unwrap_or(0);
        Self {
            attachments,
            next_id: next_id.max(highest),
        }
    }

    /// The last id handed out by this ledger.
    #[must_use]
    pub const fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Records an attachment, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the file name is empty or contains a path separator.
    pub fn add(&mut self, draft: AttachmentDraft, at: OffsetDateTime) -> Result<u32, DomainError> {
        validate_file_name(&draft.file_name)?;
        if draft.storage_key.trim().is_empty() {
            return Err(DomainError::MissingField {
                field: "storage_key",
            });
        }

        let id: u32 = self.next_id + 1;
        self.attachments.push(Attachment {
            id,
            file_name: draft.file_name,
            content_type: draft.content_type,
            size_bytes: draft.size_bytes,
            storage_key: draft.storage_key,
            description: draft.description,
            uploaded_by: draft.uploaded_by,
            uploaded_at: at,
        });
        self.next_id = id;
        Ok(id)
    }

    /// Removes an attachment by id, returning it so its bytes can be deleted.
    ///
    /// # Errors
    ///
    /// Returns `AttachmentNotFound` for an unknown id.
    pub fn remove(&mut self, id: u32) -> Result<Attachment, DomainError> {
        let position: usize = self
            .attachments
            .iter()
            .position(|a| a.id == id)
            .ok_or(DomainError::AttachmentNotFound(id))?;
        Ok(self.attachments.remove(position))
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.attachments.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}
