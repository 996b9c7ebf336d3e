//! The generator's library of saved codes.

use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info};
use qrdesk_states::{
    HexColor, KeyValueStore, SAVED_CODES_KEY, SavedCode, ShapeStyle, StorageError,
    load_collection, save_collection,
};
use uuid::Uuid;

use crate::config::BusinessConfig;
use crate::error::{SavedCodeError, ValidationError};
use crate::notify::{Notice, Notifier};
use crate::render::{CodeStyle, FALLBACK_TEXT};

/// Generator form input, unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCodeDraft {
    pub url: String,
    pub name: String,
    pub background_color: String,
    pub foreground_color: String,
    pub shape: ShapeStyle,
    pub size: u32,
    pub include_margin: bool,
}

impl Default for SavedCodeDraft {
    fn default() -> Self {
        Self {
            url: FALLBACK_TEXT.to_owned(),
            name: String::new(),
            background_color: HexColor::WHITE.to_string(),
            foreground_color: HexColor::BLACK.to_string(),
            shape: ShapeStyle::Square,
            size: 200,
            include_margin: true,
        }
    }
}

impl SavedCodeDraft {
    /// Parses the draft's styling without checking url, name or size.
    pub fn style(&self) -> Result<CodeStyle, ValidationError> {
        Ok(CodeStyle {
            background: self.background_color.parse()?,
            foreground: self.foreground_color.parse()?,
            shape: self.shape,
            size: self.size,
            include_margin: self.include_margin,
        })
    }
}

/// Saved codes in insertion order, persisted under [`SAVED_CODES_KEY`].
pub struct SavedCodes {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    sizes: RangeInclusive<u32>,
    codes: Vec<SavedCode>,
}

impl SavedCodes {
    pub fn load(
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        config: &BusinessConfig,
    ) -> Self {
        let codes = load_collection(store.as_ref(), SAVED_CODES_KEY);
        Self {
            store,
            notifier,
            sizes: config.code_sizes.clone(),
            codes,
        }
    }

    pub fn list(&self) -> &[SavedCode] {
        &self.codes
    }

    pub fn get(&self, id: Uuid) -> Option<&SavedCode> {
        self.codes.iter().find(|c| c.id == id)
    }

    /// Checks a draft in form order: url, name, colors, size.
    pub fn validate(&self, draft: &SavedCodeDraft) -> Result<CodeStyle, ValidationError> {
        if draft.url.trim().is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        if draft.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        let style = draft.style()?;
        if !self.sizes.contains(&draft.size) {
            return Err(ValidationError::SizeOutOfRange {
                size: draft.size,
                min: *self.sizes.start(),
                max: *self.sizes.end(),
            });
        }
        Ok(style)
    }

    /// Validates and appends a new saved code.
    ///
    /// Nothing is stored when validation or the write fails.
    pub fn save(&mut self, draft: &SavedCodeDraft) -> Result<SavedCode, SavedCodeError> {
        let style = match self.validate(draft) {
            Ok(style) => style,
            Err(e) => {
                self.notifier.notify(Notice::error("Error", e.to_string()));
                return Err(e.into());
            }
        };

        let code = SavedCode {
            id: Uuid::new_v4(),
            url: draft.url.trim().to_owned(),
            background_color: style.background,
            foreground_color: style.foreground,
            shape: style.shape,
            size: style.size,
            include_margin: style.include_margin,
            name: draft.name.trim().to_owned(),
            created_at: Utc::now(),
        };
        self.codes.push(code.clone());

        if let Err(e) = self.persist() {
            self.codes.pop();
            return Err(e.into());
        }
        info!("Saved code {} ({})", code.id, code.name);
        self.notifier
            .notify(Notice::success("Success", "QR code saved successfully!"));
        Ok(code)
    }

    /// Removes the code with `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, StorageError> {
        let Some(index) = self.codes.iter().position(|c| c.id == id) else {
            return Ok(false);
        };
        let removed = self.codes.remove(index);

        if let Err(e) = self.persist() {
            self.codes.insert(index, removed);
            return Err(e);
        }
        info!("Deleted code {id}");
        self.notifier.notify(Notice::success("Deleted", "QR code removed"));
        Ok(true)
    }

    fn persist(&self) -> Result<(), StorageError> {
        save_collection(self.store.as_ref(), SAVED_CODES_KEY, &self.codes).inspect_err(|e| {
            error!("Failed to persist saved codes: {e}");
            self.notifier
                .notify(Notice::error("Error", "Could not write saved codes"));
        })
    }
}
