//! Multi-step form wizard.
//!
//! The wizard owns a [`Draft`] of loosely-typed field values, validates one
//! step at a time against a [`FormSchema`], and writes the draft to a
//! [`DraftStore`] after every change so a restarted session resumes where the
//! user left off.

use crate::errors::AppError;
use crate::schema::{FormSchema, OtherText};
use crate::validation::{is_chosen, FieldErrors, FieldSource};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// A single form value as the front end holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
}

impl FieldValue {
    fn is_populated(&self) -> bool {
        match self {
            FieldValue::Flag(b) => *b,
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::Choices(v) => !v.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::Choices(items)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Flag(b)
    }
}

/// Accumulated wizard state, persisted between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Draft {
    pub fields: BTreeMap<String, FieldValue>,
    /// Number of steps that passed validation.
    pub progress: u8,
    /// Server-side id once the record has been created.
    pub remote_id: Option<u64>,
}

impl Draft {
    /// Field values as a JSON object, ready to post.
    pub fn to_payload(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(name, value)| {
                serde_json::to_value(value)
                    .ok()
                    .map(|v| (name.clone(), v))
            })
            .collect()
    }
}

impl FieldSource for Draft {
    fn text(&self, field: &str) -> Option<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Text(s)) => Some(s.trim()).filter(|s| !s.is_empty()),
            _ => None,
        }
    }

    fn choices(&self, field: &str) -> Vec<&str> {
        match self.fields.get(field) {
            Some(FieldValue::Choices(items)) => items.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    fn flag(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(FieldValue::Flag(true)))
    }
}

/// Durable storage for drafts, keyed by form name.
pub trait DraftStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Draft>, AppError>;
    fn save(&self, key: &str, draft: &Draft) -> Result<(), AppError>;
    fn clear(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryDraftStore {
    drafts: Mutex<HashMap<String, Draft>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &str) -> Result<Option<Draft>, AppError> {
        Ok(self.drafts.lock().get(key).cloned())
    }

    fn save(&self, key: &str, draft: &Draft) -> Result<(), AppError> {
        self.drafts.lock().insert(key.to_string(), draft.clone());
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), AppError> {
        self.drafts.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per draft under `dir`.
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}-draft.json", key))
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &str) -> Result<Option<Draft>, AppError> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::InternalError(format!(
                    "Failed to read draft {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                // A corrupt draft is discarded rather than blocking the form
                tracing::warn!("Ignoring unreadable draft {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn save(&self, key: &str, draft: &Draft) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::InternalError(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;
        let bytes = serde_json::to_vec_pretty(draft)
            .map_err(|e| AppError::InternalError(format!("Failed to serialize draft: {}", e)))?;
        let path = self.path(key);
        fs::write(&path, bytes).map_err(|e| {
            AppError::InternalError(format!("Failed to write draft {}: {}", path.display(), e))
        })
    }

    fn clear(&self, key: &str) -> Result<(), AppError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::InternalError(format!(
                "Failed to remove draft: {}",
                e
            ))),
        }
    }
}

/// Result of [`Wizard::next`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Moved to this step.
    Moved(usize),
    /// Last step passed; the payload is ready to submit.
    Submit(Map<String, Value>),
    /// The current step has errors; see [`Wizard::errors`].
    Blocked,
}

pub struct Wizard<S: DraftStore> {
    schema: &'static FormSchema,
    store: S,
    draft: Draft,
    current: usize,
    errors: FieldErrors,
}

impl<S: DraftStore> Wizard<S> {
    /// Loads any saved draft for `schema` and jumps to the furthest reachable step.
    pub fn resume(schema: &'static FormSchema, store: S) -> Result<Self, AppError> {
        let draft = store.load(schema.name)?.unwrap_or_default();
        let current = resume_step(schema, &draft);
        if current > 1 {
            tracing::debug!("Resuming {} wizard at step {}", schema.name, current);
        }

        Ok(Self {
            schema,
            store,
            draft,
            current,
            errors: FieldErrors::new(),
        })
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn step_title(&self) -> &'static str {
        self.schema.step(self.current).map_or("", |s| s.title)
    }

    pub fn is_last_step(&self) -> bool {
        self.current == self.schema.step_count()
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn remote_id(&self) -> Option<u64> {
        self.draft.remote_id
    }

    pub fn attach_remote_id(&mut self, id: u64) -> Result<(), AppError> {
        self.draft.remote_id = Some(id);
        self.persist()
    }

    /// Sets a field, clears its error and saves the draft.
    pub fn update_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), AppError> {
        let selected = self.selected_companions();
        self.draft.fields.insert(name.to_string(), value.into());
        self.errors.clear_field(name);
        self.prune_deselected(&selected);
        self.persist()
    }

    /// Checks or unchecks `option` in a multi-select field.
    pub fn toggle_option(&mut self, field: &str, option: &str, checked: bool) -> Result<(), AppError> {
        let selected = self.selected_companions();
        let mut choices: Vec<String> = self
            .draft
            .choices(field)
            .into_iter()
            .map(str::to_string)
            .collect();

        if checked {
            if !choices.iter().any(|c| c == option) {
                choices.push(option.to_string());
            }
        } else {
            choices.retain(|c| c != option);
        }

        self.draft
            .fields
            .insert(field.to_string(), FieldValue::Choices(choices));
        self.errors.clear_field(field);
        self.prune_deselected(&selected);
        self.persist()
    }

    /// Links whose option is currently selected.
    fn selected_companions(&self) -> Vec<&'static OtherText> {
        self.schema
            .other_texts
            .iter()
            .filter(|other| is_chosen(&self.draft, other.parent, other.option))
            .collect()
    }

    /// Drops free-text companions whose option was selected before the last
    /// change and is not any more. Text typed ahead of its option is kept.
    fn prune_deselected(&mut self, selected: &[&'static OtherText]) {
        for other in selected {
            if is_chosen(&self.draft, other.parent, other.option) {
                continue;
            }
            self.errors.clear_field(other.text_field);
            if self.draft.fields.remove(other.text_field).is_some() {
                tracing::debug!("Cleared {} after {} was deselected", other.text_field, other.option);
            }
        }
    }

    pub fn validate_step(&self, step: usize) -> FieldErrors {
        self.schema.validate_step(step, &self.draft)
    }

    /// Validates the current step and advances, or yields the payload on the last step.
    pub fn next(&mut self) -> Result<Advance, AppError> {
        let errors = self.validate_step(self.current);
        if !errors.is_empty() {
            tracing::debug!(
                "{} step {} blocked by {} error(s)",
                self.schema.name,
                self.current,
                errors.len()
            );
            self.errors = errors;
            return Ok(Advance::Blocked);
        }

        self.errors = FieldErrors::new();
        self.draft.progress = self.draft.progress.max(self.current as u8);
        self.persist()?;

        if self.is_last_step() {
            return Ok(Advance::Submit(self.draft.to_payload()));
        }
        self.current += 1;
        Ok(Advance::Moved(self.current))
    }

    pub fn back(&mut self) {
        self.current = self.current.saturating_sub(1).max(1);
        self.errors = FieldErrors::new();
    }

    /// Forgets the draft after a successful submission.
    pub fn finish(&mut self) -> Result<(), AppError> {
        self.store.clear(self.schema.name)?;
        self.draft = Draft::default();
        self.current = 1;
        self.errors = FieldErrors::new();
        tracing::info!("✓ {} wizard finished, draft cleared", self.schema.name);
        Ok(())
    }

    fn persist(&self) -> Result<(), AppError> {
        self.store.save(self.schema.name, &self.draft)
    }
}

/// Furthest step whose fields are already populated, or the step after the
/// recorded progress when that is further.
fn resume_step(schema: &FormSchema, draft: &Draft) -> usize {
    let populated = schema
        .steps
        .iter()
        .rposition(|step| {
            step.fields
                .iter()
                .any(|f| draft.fields.get(f.field).is_some_and(FieldValue::is_populated))
        })
        .map_or(1, |idx| idx + 1);

    let after_progress = draft.progress as usize + 1;
    populated.max(after_progress).clamp(1, schema.step_count().max(1))
}
