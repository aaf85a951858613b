use anyhow::Result;

use revdict::config::RevdictConfig;

/// Display dictionary statistics in the terminal.
pub fn stats(config: &RevdictConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = revdict::db::open_database(&db_path)?;

    let response = revdict::dictionary::stats::dictionary_stats(&conn, Some(&db_path))?;

    println!("Dictionary Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total entries:       {}", response.total_entries);
    println!("  Total features:      {}", response.total_features);
    println!("    Verbatim:          {}", response.verbatim_features);
    println!("    Autogenerated:     {}", response.autogenerated_features);
    println!();

    println!("Embeddings by model:");
    for (model, count) in &response.embeddings_by_model {
        println!("  {:<44} {}", model.as_str(), count);
    }
    println!();

    println!("Database size:         {} bytes", response.db_size_bytes);
    if let Some(ref oldest) = response.oldest_entry {
        println!("Oldest entry:          {oldest}");
    }
    if let Some(ref newest) = response.newest_entry {
        println!("Newest entry:          {newest}");
    }

    Ok(())
}
