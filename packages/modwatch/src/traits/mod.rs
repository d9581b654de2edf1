//! Core trait abstractions: analyzer, feed sources, storage, notification.

pub mod ai;
pub mod feed;
pub mod notify;
pub mod store;
