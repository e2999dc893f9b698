//! # MemeFlow Core Library
//!
//! Caption editing pipeline for meme templates: a per-template caption store,
//! a debounced render scheduler that only ever publishes the newest preview,
//! and adapters for the Imgflip rendering service and Gemini caption generation.
//!
//! The entry point is [`app::EditorBuilder`], which spawns the editor loop and
//! hands back an [`app::EditorHandle`].

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod integrations;
pub mod resources;
pub mod session;
pub mod store;
pub mod systems;
pub mod traits;

pub use app::{EditorBuilder, EditorHandle};
pub use config::EditorConfig;
