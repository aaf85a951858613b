pub mod doctor;
pub mod embed;
pub mod export;
pub mod import;
pub mod inspect;
pub mod random;
pub mod search;
pub mod stats;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use revdict::config::RevdictConfig;
use revdict::dictionary::EntryStore;
use revdict::service::ReverseDictionary;

/// Open the database and resolve providers for commands that embed text.
pub fn open_dictionary(config: &RevdictConfig) -> Result<ReverseDictionary> {
    let db_path = config.resolved_db_path();
    let store = EntryStore::open(&db_path)?;
    let embedders = revdict::embedding::create_embedders(config)?;
    Ok(ReverseDictionary::new(embedders, store, config.search.clone()))
}

/// A token cancelled on Ctrl-C, so long commands stop at the next boundary.
pub fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping");
            token.cancel();
        }
    });
    cancel
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
            .expect("valid template")
            .progress_chars("##-"),
    );
    pb
}
