//! CLI `inspect` command: display an entry with its features and vectors.

use anyhow::Result;

use revdict::config::RevdictConfig;
use revdict::dictionary::read::{entry_by_id, entry_features};

/// Inspect a single entry by ID and display full details.
pub fn inspect(config: &RevdictConfig, id: i64) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = revdict::db::open_database(&db_path)?;

    let Some(stored) = entry_by_id(&conn, id)? else {
        anyhow::bail!("entry {id} not found");
    };
    let features = entry_features(&conn, id)?;

    let e = &stored.entry;
    println!("Entry: {} (#{})", e.text, stored.id);
    println!("{}", "=".repeat(50));
    if let Some(ref author) = e.author {
        println!("  Author:         {author}");
    }
    if !e.example.is_empty() {
        println!("  Example:        {}", e.example);
    }
    println!();
    println!("Definition:");
    for line in e.definition.lines() {
        println!("  {line}");
    }

    println!();
    println!("Features ({}):", features.len());
    for feature in &features {
        let kind = if feature.autogenerated { "auto" } else { "verbatim" };
        println!("  [{kind}] {}", feature.phrase);
        for (model, vector) in &feature.embeddings {
            println!("      {model}: {} dims", vector.len());
        }
    }

    Ok(())
}
