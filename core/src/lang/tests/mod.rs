//! Tests for the snippet language
//!
//! Organized by stage: parsing, validation, evaluation, helpers

mod helpers;
