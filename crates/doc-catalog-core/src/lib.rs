//! # Doc Catalog Core
//!
//! Shared, platform-neutral logic for Doc Catalog: the document model and its
//! wire mapping, version ordering, sorting, change broadcasting, the
//! repository abstraction, and the create/load use cases.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Network and disk access enter through the
//! [`service::DocumentSource`] and [`store::KeyValueStore`] traits.

pub mod broadcast;
pub mod grid;
pub mod models;
pub mod service;
pub mod sort;
pub mod store;
pub mod toast;
pub mod version;
