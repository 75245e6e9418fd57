//! Consultancy Leads API Library
//!
//! This library provides the lead-capture backend for the consultancy website
//! (form schemas, validation, in-memory storage, the bot-protected submission
//! pipeline and its external clients) together with the multi-step form
//! wizard that drives the assessment and intake forms.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Schemas, validation, storage and the wizard.
//! - `integrations`: External service clients.
//! - `booking`: Consultation slot availability.
//! - `config`: Configuration management.
//! - `email`: Confirmation email client and templates.
//! - `errors`: Error handling types.
//! - `handlers`: Application state and the simple form endpoints.
//! - `models`: Stored records and request payloads.
//! - `recaptcha`: Bot-token verification.
//! - `routes`: Router assembly.
//! - `schema`: Declarative form schemas.
//! - `storage`: In-memory store.
//! - `submission`: The verify → validate → persist → notify → email pipeline.
//! - `task_client`: Task-tracking (ClickUp) client and summaries.
//! - `validation`: Schema validation and field validators.
//! - `wizard`: Multi-step form state machine and draft storage.
//! - `wizard_client`: Staged submission client used by the wizard.

pub mod api;
pub mod core;
pub mod integrations;

pub mod booking;
pub mod config;
pub mod email;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod recaptcha;
pub mod routes;
pub mod schema;
pub mod storage;
pub mod submission;
pub mod task_client;
pub mod validation;
pub mod wizard;
pub mod wizard_client;
