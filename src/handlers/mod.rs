// Video Subtitle API HTTP handlers
//
// This module contains the HTTP handlers for the Video Subtitle API.
// It provides the interface between HTTP requests and the translation pipeline.

pub mod form;
pub mod routes;


// Re-export handlers for easier access
pub use self::routes::{configure, index, metrics_handler, translate_video};
