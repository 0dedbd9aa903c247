#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Professional roster intake for the services directory.
//!
//! The directory admin loads professionals in bulk from a CSV roster.
//! The pipeline has three independent stages: [`parse`] turns the file
//! into typed rows plus per-row issues (a malformed row never aborts
//! the file), [`validate`] checks each row without touching the
//! network, and [`upload`] creates the accepted rows on the services
//! platform one request at a time, reporting per-row outcomes.
//!
//! CSV columns and wire fields share the platform's Spanish names
//! (`nombre`, `email`, `telefono`, `rubro`, `experiencia`,
//! `matricula`).

pub mod parse;
pub mod upload;
pub mod validate;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during roster operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// CSV reading failed before any row could be produced.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success HTTP status.
    #[error("services platform returned HTTP {status}")]
    RemoteStatus {
        /// The HTTP status code received.
        status: u16,
    },

    /// The platform envelope reported `success: false`.
    #[error("services platform rejected the request: {}", message.as_deref().unwrap_or("no message"))]
    RemoteRejected {
        /// Server-provided rejection message, when present.
        message: Option<String>,
    },

    /// The create response carried no usable record id.
    #[error("malformed response: {detail}")]
    MalformedResponse {
        /// Description of what was wrong with the body.
        detail: String,
    },
}

/// One professional as read from the roster CSV and sent to the
/// platform's create endpoint. Column and wire names coincide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionalRow {
    /// Full name.
    #[serde(rename = "nombre")]
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone, if provided.
    #[serde(rename = "telefono", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Trade or service category.
    #[serde(rename = "rubro")]
    pub trade: String,
    /// Years of experience, if provided.
    #[serde(
        rename = "experiencia",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub years_experience: Option<u32>,
    /// Professional license number, if provided.
    #[serde(
        rename = "matricula",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub license_number: Option<String>,
}
