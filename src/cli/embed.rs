//! CLI `embed` and `compare` commands: diagnostics against live providers.

use anyhow::Result;

use revdict::config::RevdictConfig;
use revdict::dictionary::types::Model;

/// Print a phrase's vectors as a JSON object keyed by model name.
pub async fn embed(config: &RevdictConfig, phrase: &str, model: Option<Model>) -> Result<()> {
    let dictionary = super::open_dictionary(config)?;
    let cancel = super::interrupt_token();

    let mut vectors = dictionary.embed_phrase(&cancel, phrase).await?;
    if let Some(model) = model {
        vectors.retain(|m, _| *m == model);
        anyhow::ensure!(!vectors.is_empty(), "model {model} is not enabled");
    }

    println!("{}", serde_json::to_string(&vectors)?);
    Ok(())
}

/// Print the cosine distance between two phrases under each model.
pub async fn compare(
    config: &RevdictConfig,
    a: &str,
    b: &str,
    model: Option<Model>,
) -> Result<()> {
    let dictionary = super::open_dictionary(config)?;
    let cancel = super::interrupt_token();

    let mut distances = dictionary.compare(&cancel, a, b).await?;
    if let Some(model) = model {
        distances.retain(|m, _| *m == model);
        anyhow::ensure!(!distances.is_empty(), "model {model} is not enabled");
    }
    for (model, distance) in distances {
        println!("  {:<44} {distance:.6}", model.as_str());
    }
    Ok(())
}
