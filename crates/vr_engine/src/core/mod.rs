//! Core engine modules
//!
//! Engine-wide settings shared by the scene graph and the renderer.

pub mod config;
