use anyhow::Result;
use std::io::Write;

use revdict::config::RevdictConfig;
use revdict::dictionary::read::all_entries;

/// Stream every entry to stdout as one JSON object per line.
pub fn export(config: &RevdictConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = revdict::db::open_database(&db_path)?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let mut count = 0u64;
    for entry in all_entries(&conn) {
        serde_json::to_writer(&mut out, &entry?)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;

    eprintln!("Exported {count} entries.");
    Ok(())
}
