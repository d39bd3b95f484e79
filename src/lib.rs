//! # Doc Catalog
//!
//! A document catalog client: it bulk-loads documents from a catalog API,
//! keeps them in a pluggable local repository, sorts them for display, and
//! follows a live notification stream for documents created elsewhere.
//!
//! Domain types, sorting, the change broadcaster, the repository trait and
//! the use cases live in [`doc_catalog_core`]. This crate adds the I/O:
//! HTTP, WebSocket, file storage, terminal output and the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  GET /documents   ┌─────────────────┐   save   ┌──────────────┐
//! │ Catalog API  │──────────────────▶│ DocumentService │─────────▶│  Repository  │
//! └──────┬───────┘                   └────────┬────────┘          │ memory/file  │
//!        │ ws /notifications                  │                   └──────┬───────┘
//!        ▼                                    ▼                          │ publish
//! ┌──────────────┐   toasts   ┌────────────────────┐   re-render         │
//! │ StreamClient │──────────▶│ DocumentController │◀────────────────────┘
//! └──────────────┘            └─────────┬──────────┘
//!                                       ▼
//!                               grid + toasts (stdout)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! doccat list --sort version           # load from the API and print
//! doccat cached --sort createdDate     # print the local copy
//! doccat create --title "Spec" --version 1.0 --contributor Ada
//! doccat watch                         # follow live notifications
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`api`] | HTTP document source |
//! | [`file_store`] | File-backed key/value slots |
//! | [`stream`] | Reconnecting notification stream client |
//! | [`render`] | Terminal grid and toast output |
//! | [`controller`] | Interactive session orchestration |
//! | [`app`] | Component wiring from configuration |
//! | [`commands`] | CLI command implementations |
//! | [`logging`] | stderr log setup from `-v` and `RUST_LOG` |

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod controller;
pub mod file_store;
pub mod logging;
pub mod render;
pub mod stream;

pub use doc_catalog_core as core;
