//! Part-of-speech tagging and lemmatization
//!
//! Tagging is delegated to an external program that reads raw text on stdin
//! and writes CoNLL-U on stdout, such as UDPipe with a Finnish model.

use crate::{config::AnalyzeConfig, conllu, Result};
use anyhow::{bail, Context};
use std::{
    io::Write,
    panic,
    process::{Command, Stdio},
    thread,
};

/// Token annotated with its lemma and part of speech
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaggedToken {
    /// Word form, as it appears in the text
    pub form: Box<str>,

    /// Dictionary form, or "_" if unknown
    pub lemma: Box<str>,

    /// Universal part-of-speech tag (NOUN, VERB, PUNCT...)
    pub tag: Box<str>,
}
//
impl From<conllu::Word<'_>> for TaggedToken {
    fn from(word: conllu::Word<'_>) -> Self {
        Self {
            form: word.form.into(),
            lemma: word.lemma.into(),
            tag: word.upos.into(),
        }
    }
}
//
impl TaggedToken {
    /// Lemma of the token, falling back to its form if the lemma is unknown
    pub fn lemma_or_form(&self) -> &str {
        if &*self.lemma == "_" {
            &self.form
        } else {
            &self.lemma
        }
    }
}

/// Something that splits text into tagged tokens
pub trait Tagger {
    /// Tokenize, tag and lemmatize a text
    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>>;
}

/// Tagger backed by an external CoNLL-U producing program
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandTagger {
    program: Box<str>,
    args: Box<[Box<str>]>,
}
//
impl CommandTagger {
    /// Set up a tagger that runs `program` with `args` on each text
    pub fn new(
        program: impl Into<Box<str>>,
        args: impl IntoIterator<Item = impl Into<Box<str>>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Set up the tagger selected on the command line
    pub fn from_config(config: &AnalyzeConfig) -> Self {
        Self::new(config.tagger_program.clone(), config.tagger_args.iter().cloned())
    }
}
//
impl Tagger for CommandTagger {
    fn tag(&mut self, text: &str) -> Result<Vec<TaggedToken>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let program = &*self.program;
        let mut child = Command::new(program)
            .args(self.args.iter().map(|arg| &**arg))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start tagger {program}"))?;
        let mut stdin = child
            .stdin
            .take()
            .context("tagger stdin should be piped")?;

        // Feed the text from another thread so that neither pipe can fill up
        // while we wait on the other
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(text.as_bytes()));
            let output = child.wait_with_output();
            let written = writer.join().unwrap_or_else(|p| panic::resume_unwind(p));
            (written, output)
        });

        let output = output.with_context(|| format!("waiting for tagger {program}"))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tagger {program} returned {}: {}", output.status, stderr.trim());
        }
        written.with_context(|| format!("sending text to tagger {program}"))?;
        let conllu = String::from_utf8(output.stdout)
            .with_context(|| format!("tagger {program} emitted non-UTF-8 output"))?;
        let words = conllu::parse_words(&conllu)
            .with_context(|| format!("decoding output of tagger {program}"))?;
        log::trace!("Tagged {} words", words.len());
        Ok(words.into_iter().map(TaggedToken::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conllu_from_a_program_is_decoded() {
        // cat echoes its input, which here is already tagged
        let mut tagger = CommandTagger::new("cat", [] as [&str; 0]);
        let tokens = tagger
            .tag("# text = Kissa istuu.\n\
                  1\tKissa\tkissa\tNOUN\t_\t_\t2\tnsubj\t_\t_\n\
                  2\tistuu\tistua\tVERB\t_\t_\t0\troot\t_\t_\n\
                  3\t.\t.\tPUNCT\t_\t_\t2\tpunct\t_\t_\n\
                  4\tEU\t_\tPROPN\t_\t_\t2\tobl\t_\t_\n")
            .unwrap();
        let tags = tokens.iter().map(|t| &*t.tag).collect::<Vec<_>>();
        assert_eq!(tags, ["NOUN", "VERB", "PUNCT", "PROPN"]);
        assert_eq!(&*tokens[1].form, "istuu");
        assert_eq!(&*tokens[3].lemma, "_");
        assert_eq!(tokens[3].lemma_or_form(), "EU");
        assert_eq!(&*tokens[1].lemma, "istua");
    }

    #[test]
    fn blank_text_needs_no_tagging() {
        let mut tagger = CommandTagger::new("lausunto-no-such-tagger", ["--tag"]);
        assert!(tagger.tag(" \n").unwrap().is_empty());
    }

    #[test]
    fn tagger_failures_are_errors() {
        let mut missing = CommandTagger::new("lausunto-no-such-tagger", ["--tag"]);
        assert!(missing.tag("Kissa istuu.").is_err());

        let mut failing = CommandTagger::new("sh", ["-c", "echo broken model >&2; exit 2"]);
        let err = failing.tag("Kissa istuu.").unwrap_err();
        assert!(err.to_string().contains("broken model"));

        // Raw text is not CoNLL-U
        let mut echo = CommandTagger::new("cat", [] as [&str; 0]);
        assert!(echo.tag("Kissa\tistuu.").is_err());
    }
}
