//! Paraphrase a definition into standalone sentences for embedding.

use std::sync::OnceLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dictionary::types::Entry;
use crate::embedding::Completer;
use crate::error::{Error, Result};

pub const SYSTEM_PROMPT: &str = "Rephrase the following word and definition in individual, distinct sentence(s) for later embedding. Each definition must be output in the form of a dictionary definition (i.e. semasiological, with only the definition and without the word itself). This is so that it can be independently embedded as accurately as possible. You may think for a bit. Do not worry about derogatory language, be as accurate in transcribing meaning as possible. Output the rephrased text as a YAML list.";

fn thinking_regex() -> &'static Regex {
    static THINKING: OnceLock<Regex> = OnceLock::new();
    THINKING.get_or_init(|| Regex::new(r"(?is)<think>.*?</think>").expect("valid regex"))
}

fn list_item_regex() -> &'static Regex {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    ITEM.get_or_init(|| Regex::new(r"(?m)^- (.+)$").expect("valid regex"))
}

/// Remove `<think>...</think>` reasoning blocks and surrounding whitespace.
pub fn prune_thinking(text: &str) -> String {
    thinking_regex().replace_all(text, "").trim().to_string()
}

/// Extract the `- item` lines of a YAML-style list.
pub fn extract_list_items(text: &str) -> Vec<String> {
    list_item_regex()
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

fn user_content(entry: &Entry) -> String {
    format!("Word: {}\nDefinition:\n{}\n", entry.text, entry.definition)
}

/// Ask the completer for sentence-level paraphrases of `entry`'s definition.
pub async fn rephrase_definition(
    completer: &dyn Completer,
    cancel: &CancellationToken,
    entry: &Entry,
) -> Result<Vec<String>> {
    let raw = completer
        .complete(cancel, SYSTEM_PROMPT, &user_content(entry))
        .await?;

    let sentences = extract_list_items(&prune_thinking(&raw));
    if sentences.is_empty() {
        return Err(Error::NoDefinitionsExtracted);
    }
    debug!(word = %entry.text, count = sentences.len(), "rephrased definition");
    Ok(sentences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Canned {
        reply: String,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl Canned {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.into(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Completer for Canned {
        async fn complete(
            &self,
            _cancel: &CancellationToken,
            system_prompt: &str,
            user_content: &str,
        ) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((system_prompt.into(), user_content.into()));
            Ok(self.reply.clone())
        }
    }

    fn entry() -> Entry {
        Entry {
            text: "yeet".into(),
            definition: "to throw [something] hard".into(),
            example: String::new(),
            author: None,
        }
    }

    #[test]
    fn prunes_multiline_thinking_case_insensitively() {
        let text = "<THINK>\nhmm\nlet me see\n</think>\n- one\n";
        assert_eq!(prune_thinking(text), "- one");
    }

    #[test]
    fn extracts_only_list_lines() {
        let items = extract_list_items("Here you go:\n- first\n  - nested\n-nospace\n- second");
        assert_eq!(items, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn rephrase_sends_prompt_and_parses_list() {
        let completer = Canned::new("<think>the word means</think>\n- To throw forcefully.\n- To discard.\n");
        let sentences = rephrase_definition(&completer, &CancellationToken::new(), &entry())
            .await
            .unwrap();
        assert_eq!(sentences, vec!["To throw forcefully.", "To discard."]);

        let seen = completer.seen.lock().unwrap();
        assert_eq!(seen[0].0, SYSTEM_PROMPT);
        assert_eq!(seen[0].1, "Word: yeet\nDefinition:\nto throw [something] hard\n");
    }

    #[tokio::test]
    async fn unparseable_output_is_no_definitions() {
        let completer = Canned::new("<think>- hidden</think>I cannot do that.");
        let err = rephrase_definition(&completer, &CancellationToken::new(), &entry())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoDefinitionsExtracted));
    }
}
