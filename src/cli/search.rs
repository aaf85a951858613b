use anyhow::Result;

use revdict::config::RevdictConfig;

/// Run a reverse lookup from the terminal.
pub async fn search(config: &RevdictConfig, query: &str, limit: Option<usize>) -> Result<()> {
    let dictionary = super::open_dictionary(config)?;
    let cancel = super::interrupt_token();

    let results = match dictionary.search(&cancel, query, limit).await {
        Ok(results) => results,
        Err(e) if e.is_not_found() => {
            println!("No results found.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    for (model, matches) in &results {
        println!("{model}");
        println!("{}", "=".repeat(model.as_str().len()));
        if matches.is_empty() {
            println!("  (no matches)");
        }
        for (i, m) in matches.iter().enumerate() {
            println!("  {}. {} (distance: {:.4})", i + 1, m.entry.text, m.distance);
            println!("     matched: {}", m.phrase);
        }
        println!();
    }

    Ok(())
}
