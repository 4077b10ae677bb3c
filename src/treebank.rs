//! Derivation of the blog corpus from the UD Finnish-TDT treebank
//!
//! The treebank mixes several text genres, which can be told apart by the
//! first letter of each sentence's `sent_id`. We keep the raw text of the
//! blog and forum sentences, one sentence per line.

use crate::{config::TreebankConfig, conllu, Result};
use anyhow::{bail, Context};
use std::fs;

/// Extract the selected sentences of the treebank into the output file
///
/// Returns the number of extracted sentences.
pub fn run(config: &TreebankConfig) -> Result<usize> {
    let conllu = fs::read_to_string(&config.input)
        .with_context(|| format!("reading treebank {}", config.input.display()))?;
    let sentences = extract_sentences(&conllu, &config.prefixes[..])
        .with_context(|| format!("decoding treebank {}", config.input.display()))?;
    if let Some(output_dir) = config.output.parent() {
        crate::file::create_output_dir(output_dir)?;
    }
    fs::write(&config.output, sentences.join("\n"))
        .with_context(|| format!("writing {}", config.output.display()))?;
    log::info!(
        "Wrote {} sentences to {}",
        sentences.len(),
        config.output.display()
    );
    Ok(sentences.len())
}

/// Raw text of the sentences whose id starts with one of `prefixes`
///
/// The `# sent_id` comment of a selected sentence must be immediately
/// followed by its `# text` comment. Sentences that do not end with
/// terminal punctuation get a period, so that downstream tokenizers still
/// see a sentence boundary when the lines are read back as running text.
pub fn extract_sentences(conllu: &str, prefixes: &[impl AsRef<str>]) -> Result<Vec<String>> {
    let mut sentences = Vec::new();
    let mut lines = conllu.lines().enumerate();
    while let Some((_, line)) = lines.next() {
        let Some(sent_id) = conllu::comment_value(line, "sent_id") else {
            continue;
        };
        if !prefixes
            .iter()
            .any(|prefix| sent_id.starts_with(prefix.as_ref()))
        {
            continue;
        }
        let text = match lines.next() {
            Some((_, next)) if next.starts_with("# text = ") => &next["# text = ".len()..],
            Some((index, _)) => bail!(
                "line {}: sentence {sent_id} should be followed by its text",
                index + 1
            ),
            None => bail!("sentence {sent_id} has no text at the end of the treebank"),
        };
        sentences.push(terminate_sentence(text));
    }
    Ok(sentences)
}

/// Append a period to a non-empty sentence without terminal punctuation
fn terminate_sentence(text: &str) -> String {
    match text.chars().last() {
        Some(last) if !matches!(last, '.' | '!' | '?') => format!("{text}."),
        _ => text.to_owned(),
    }
}
