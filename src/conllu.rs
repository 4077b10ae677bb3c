//! Minimal CoNLL-U reader
//!
//! Only what the pipeline needs is decoded: sentence-level comments like
//! `# text = ...` and the FORM, LEMMA and UPOS columns of word lines. See
//! <https://universaldependencies.org/format.html> for the full format.

use crate::Result;
use anyhow::{bail, Context};

/// Number of tab-separated columns on a CoNLL-U word line
const NUM_COLUMNS: usize = 10;

/// Syntactic word from a CoNLL-U word line
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Word<'text> {
    /// Word form or punctuation symbol
    pub form: &'text str,

    /// Lemma or stem of the word form
    pub lemma: &'text str,

    /// Universal part-of-speech tag
    pub upos: &'text str,
}

/// Value of a `# key = value` comment line, if `line` is one
pub fn comment_value<'line>(line: &'line str, key: &str) -> Option<&'line str> {
    line.strip_prefix('#')?
        .trim_start()
        .strip_prefix(key)?
        .trim_start()
        .strip_prefix('=')
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
}

/// Decode a single line of CoNLL-U
///
/// Comments, blank lines, multiword token ranges (`1-2`) and empty nodes
/// (`1.1`) carry no syntactic word and yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Word<'_>>> {
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let columns = line.split('\t').collect::<Vec<_>>();
    let &[id, form, lemma, upos, _, _, _, _, _, _] = columns.as_slice() else {
        bail!("expected {NUM_COLUMNS} tab-separated columns, found {}", columns.len());
    };
    if id.contains(['-', '.']) {
        return Ok(None);
    }
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        bail!("invalid word ID {id:?}");
    }
    Ok(Some(Word { form, lemma, upos }))
}

/// Decode every syntactic word of a CoNLL-U document, in order
pub fn parse_words(conllu: &str) -> Result<Vec<Word<'_>>> {
    let mut words = Vec::new();
    for (index, line) in conllu.lines().enumerate() {
        let word = parse_line(line).with_context(|| format!("on CoNLL-U line {}", index + 1))?;
        words.extend(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "\
# newdoc
# sent_id = b101.1
# text = Kissa istuu.
1\tKissa\tkissa\tNOUN\tN\tCase=Nom|Number=Sing\t2\tnsubj\t_\t_
2\tistuu\tistua\tVERB\tV\tMood=Ind\t0\troot\t_\tSpaceAfter=No
3\t.\t.\tPUNCT\tPunct\t_\t2\tpunct\t_\t_

";

    #[test]
    fn comments() {
        assert_eq!(comment_value("# text = Kissa istuu.", "text"), Some("Kissa istuu."));
        assert_eq!(comment_value("# sent_id = b101.1", "sent_id"), Some("b101.1"));
        assert_eq!(comment_value("# text = ", "text"), Some(""));
        assert_eq!(comment_value("# newdoc", "text"), None);
        assert_eq!(comment_value("# text_en = Cat sits.", "text"), None);
        assert_eq!(comment_value("1\tKissa", "text"), None);
    }

    #[test]
    fn words_are_decoded_in_order() {
        let words = parse_words(SENTENCE).unwrap();
        assert_eq!(
            words,
            [
                Word {
                    form: "Kissa",
                    lemma: "kissa",
                    upos: "NOUN"
                },
                Word {
                    form: "istuu",
                    lemma: "istua",
                    upos: "VERB"
                },
                Word {
                    form: ".",
                    lemma: ".",
                    upos: "PUNCT"
                },
            ]
        );
    }

    #[test]
    fn multiword_tokens_and_empty_nodes_are_skipped() {
        let conllu = "1-2\tettei\t_\t_\t_\t_\t_\t_\t_\t_\n\
                      1\tettä\tettä\tSCONJ\t_\t_\t3\tmark\t_\t_\n\
                      2\tei\tei\tAUX\t_\t_\t3\taux\t_\t_\n\
                      2.1\tole\tolla\tAUX\t_\t_\t_\t_\t3:aux\t_\n";
        let lemmas = parse_words(conllu)
            .unwrap()
            .into_iter()
            .map(|word| word.lemma)
            .collect::<Vec<_>>();
        assert_eq!(lemmas, ["että", "ei"]);
    }

    #[test]
    fn malformed_lines_are_errors() {
        let err = parse_words("# ok\n1\tKissa\tkissa\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
        assert!(parse_line("x\ta\tb\tc\t_\t_\t_\t_\t_\t_").is_err());
    }
}
