//! mediaprep library
//!
//! Client side of a media preprocessing and augmentation backend: file
//! intake, the HTTP/fixture transports, typed response decoding, HTML
//! renderers for each media category, and the workflow controller that ties
//! them to an on-screen surface.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod render;
pub mod server;
pub mod workflow;

pub use error::{ClientError, ClientResult};
