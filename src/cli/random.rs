use anyhow::{Context, Result};

use revdict::config::RevdictConfig;
use revdict::dictionary::read::random_entry;
use revdict::rephrase::rephrase_definition;

/// Print a random entry, optionally with a paraphrase of its definition.
pub async fn random(config: &RevdictConfig, rephrase: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = revdict::db::open_database(&db_path)?;

    let Some(stored) = random_entry(&conn)? else {
        println!("Dictionary is empty.");
        return Ok(());
    };

    println!("{} (#{})", stored.entry.text, stored.id);
    println!("{}", "=".repeat(40));
    println!("{}", stored.entry.definition);
    if !stored.entry.example.is_empty() {
        println!();
        println!("Example: {}", stored.entry.example);
    }

    if rephrase {
        let completer = revdict::embedding::create_completer(config)?
            .context("rephrasing needs the [swama] completion model to be enabled")?;
        let cancel = super::interrupt_token();
        let sentences = rephrase_definition(completer.as_ref(), &cancel, &stored.entry).await?;
        println!();
        println!("Rephrased:");
        for sentence in sentences {
            println!("  - {sentence}");
        }
    }

    Ok(())
}
