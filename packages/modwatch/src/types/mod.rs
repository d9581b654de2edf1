//! Domain types for the detection and review pipeline.

pub mod appearance;
pub mod config;
pub mod feed;
pub mod message;
pub mod post;
pub mod registry;
pub mod sheet;
