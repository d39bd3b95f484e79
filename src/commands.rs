//! CLI command implementations.
//!
//! Each `run_*` function backs one `doccat` subcommand. Output goes to
//! stdout; diagnostics go through `tracing`.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use doc_catalog_core::grid::grid_rows;
use doc_catalog_core::service::CreateDocumentInput;
use doc_catalog_core::sort::SortState;

use crate::app;
use crate::config::Config;
use crate::render::{format_table, TerminalGridRenderer, TerminalToastSink};

/// `doccat list`: bulk load from the API, persist, print.
pub async fn run_list(config: &Config, sort: SortState) -> Result<()> {
    let service = app::build_service(config)?;
    let documents = service.load_all_documents().await?;
    let sorted = sort.apply(&documents);
    print!(
        "{}",
        format_table(&grid_rows(&sorted, Utc::now().timestamp_millis()), sort)
    );
    Ok(())
}

/// `doccat cached`: print what the local store holds, without the network.
pub async fn run_cached(config: &Config, sort: SortState) -> Result<()> {
    let repository = app::build_repository(&config.storage)?;
    let documents = repository.get_all().await?;
    let sorted = sort.apply(&documents);
    print!(
        "{}",
        format_table(&grid_rows(&sorted, Utc::now().timestamp_millis()), sort)
    );
    Ok(())
}

/// `doccat create`: add a document to the local store.
pub async fn run_create(config: &Config, input: CreateDocumentInput) -> Result<()> {
    let service = app::build_service(config)?;
    let document = service.create_document(input).await?;
    println!("Created document {}", document.id);
    println!("  title:   {}", document.title);
    println!("  version: {}", document.version);
    println!("  created: {}", document.created_at);
    Ok(())
}

/// `doccat watch`: interactive session until Ctrl-C.
pub async fn run_watch(config: &Config, sort: SortState) -> Result<()> {
    let mut controller = app::build_controller(
        config,
        Arc::new(TerminalGridRenderer),
        Arc::new(TerminalToastSink),
    )?
    .with_sort(sort);

    controller.initialize().await?;
    println!("Watching for changes. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    controller.destroy();
    Ok(())
}
