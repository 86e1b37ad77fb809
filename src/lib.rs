//! Image generator - creates and edits images with Gemini
//!
//! Turns a text instruction (optionally paired with an existing image) into a
//! multimodal Gemini request, extracts the text and image parts of the
//! response, and saves the image to disk atomically.

pub mod ai;
pub mod app;
pub mod artifact;
pub mod error;
pub mod models;

pub use error::{Error, Result};
