use anyhow::{Context, Result};
use std::path::Path;

use revdict::config::RevdictConfig;
use revdict::dictionary::types::Entry;
use revdict::embedding::Completer;
use revdict::error::Error;

/// Accept a JSON array or the JSON lines written by `export`.
fn parse_entries(json: &str) -> Result<Vec<Entry>> {
    if json.trim_start().starts_with('[') {
        return serde_json::from_str(json).context("failed to parse import JSON");
    }
    json.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("failed to parse import JSON on line {}", i + 1))
        })
        .collect()
}

/// Ingest entries from a JSON array or JSON lines file.
///
/// Each entry is split, optionally rephrased, embedded under every enabled
/// model and stored. Entries already present (same text and definition) only
/// gain new features. A failing entry is reported and skipped; Ctrl-C stops the
/// import after the current entry rolls back.
pub async fn import(config: &RevdictConfig, file: &Path, rephrase: bool) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;
    let entries = parse_entries(&json)?;

    let dictionary = super::open_dictionary(config)?;
    let completer = if rephrase {
        Some(
            revdict::embedding::create_completer(config)?
                .context("--rephrase needs the [swama] completion model to be enabled")?,
        )
    } else {
        None
    };
    let completer: Option<&dyn Completer> = completer.as_deref();
    let cancel = super::interrupt_token();

    println!("Importing {} entries...", entries.len());
    let pb = super::progress_bar(entries.len() as u64);

    let mut created = 0u64;
    let mut existing = 0u64;
    let mut failed = 0u64;

    for entry in entries {
        pb.set_message(entry.text.clone());
        let text = entry.text.clone();
        match dictionary.ingest(&cancel, entry, completer).await {
            Ok(result) if result.created => created += 1,
            Ok(_) => existing += 1,
            Err(Error::Cancelled) => {
                pb.abandon_with_message("interrupted");
                break;
            }
            Err(e) => {
                pb.suspend(|| eprintln!("Warning: skipped {text:?}: {e}"));
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("Import complete:");
    println!("  Entries created:  {created}");
    println!("  Already present:  {existing}");
    if failed > 0 {
        println!("  Failed:           {failed}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_and_export_lines() {
        let array = r#"[{"text": "yeet", "definition": "to throw"}]"#;
        assert_eq!(parse_entries(array).unwrap()[0].text, "yeet");

        let lines = "{\"id\": 3, \"text\": \"a\", \"definition\": \"b\", \"example\": \"\"}\n\n{\"word\": \"c\", \"definition\": \"d\"}\n";
        let entries = parse_entries(lines).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].text, "c");
    }

    #[test]
    fn bad_line_is_reported_with_its_number() {
        let err = parse_entries("{\"text\": \"a\", \"definition\": \"b\"}\nnot json\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
