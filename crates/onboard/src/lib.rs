//! Core library for the business onboarding intake service.
//!
//! The [`workflows::intake`] module owns the submission pipeline (field and
//! document validation, durable storage, record persistence) and the admin
//! review workflow. HTTP wiring lives in the `onboard-api` service crate.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
