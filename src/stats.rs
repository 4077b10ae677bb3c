//! Part-of-speech and lemma usage statistics

use crate::{
    batch::BatchSummary,
    file,
    progress::{ProgressConfig, ProgressReport, Work},
    tagger::{TaggedToken, Tagger},
    top, Result,
};
use anyhow::Context;
use std::{
    collections::{hash_map, HashMap},
    fs,
    num::NonZeroUsize,
    path::Path,
};

/// Tags of tokens that are not words
const NON_WORD_TAGS: [&str; 2] = ["SPACE", "PUNCT"];

/// Lemma of the Finnish negation verb, which is not counted as a verb
const NEGATION_LEMMA: &str = "ei";

/// Tag and lemmatize every text file of a corpus directory
///
/// Files that cannot be read or tagged are skipped and do not contribute to
/// the counts.
pub fn analyze_corpus(
    dir: &Path,
    tagger: &mut impl Tagger,
    report: &ProgressReport,
) -> Result<(CorpusCounts, BatchSummary)> {
    let inputs = file::list_inputs(dir, "txt")?;
    let progress = report.add(
        format!("Tagging {}", dir.display()),
        ProgressConfig::new(Work::Documents(inputs.len())),
    );
    let mut counts = CorpusCounts::default();
    let mut summary = BatchSummary::new("analyze");
    for input in inputs {
        let result = fs::read_to_string(&input)
            .with_context(|| format!("reading {}", input.display()))
            .and_then(|text| tagger.tag(&text));
        if let Some(tokens) = summary.record(&input.display().to_string(), result) {
            let mut document_counts = CorpusCounts::default();
            document_counts.add_tokens(&tokens);
            log::debug!(
                "Found {} words in {}",
                document_counts.pos.total(),
                input.display()
            );
            counts.merge(&document_counts);
        }
        progress.make_progress(1);
    }
    progress.finish();
    log::info!(
        "Counted {} words in {} documents of {}",
        counts.pos.total(),
        summary.succeeded(),
        dir.display()
    );
    Ok((counts, summary))
}

/// Usage statistics of a corpus
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CorpusCounts {
    /// Part-of-speech tag counts
    pub pos: FrequencyTable,

    /// Adjective lemma counts
    pub adj: FrequencyTable,

    /// Noun lemma counts
    pub noun: FrequencyTable,

    /// Verb and auxiliary lemma counts, negation aside
    pub verb: FrequencyTable,
}
//
impl CorpusCounts {
    /// Account for the tokens of one text
    pub fn add_tokens(&mut self, tokens: &[TaggedToken]) {
        for token in tokens {
            let (tag, lemma) = (&*token.tag, token.lemma_or_form());
            if NON_WORD_TAGS.contains(&tag) {
                continue;
            }
            self.pos.add(tag);
            match tag {
                "ADJ" => self.adj.add(lemma),
                "NOUN" => self.noun.add(lemma),
                "VERB" | "AUX" if lemma != NEGATION_LEMMA => self.verb.add(lemma),
                _ => {}
            }
        }
    }

    /// Merge statistics from another set of documents
    pub fn merge(&mut self, other: &Self) {
        self.pos.merge(&other.pos);
        self.adj.merge(&other.adj);
        self.noun.merge(&other.noun);
        self.verb.merge(&other.verb);
    }
}

/// Number of occurences of each label, in order of first occurence
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FrequencyTable {
    /// Position of each label in `entries`
    positions: HashMap<Box<str>, usize>,

    /// Labels and their counts
    entries: Vec<(Box<str>, u64)>,
}
//
impl FrequencyTable {
    /// Count one more occurence of a label
    pub fn add(&mut self, label: &str) {
        self.add_count(label, 1);
    }

    /// Count several more occurences of a label
    pub fn add_count(&mut self, label: &str, count: u64) {
        match self.positions.entry(label.into()) {
            hash_map::Entry::Occupied(o) => self.entries[*o.get()].1 += count,
            hash_map::Entry::Vacant(v) => {
                v.insert(self.entries.len());
                self.entries.push((label.into(), count));
            }
        }
    }

    /// Number of occurences of a label
    pub fn get(&self, label: &str) -> u64 {
        self.positions
            .get(label)
            .map_or(0, |&position| self.entries[position].1)
    }

    /// Number of occurences of all labels
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Labels and counts, in order of first occurence
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(label, count)| (&**label, *count))
    }

    /// Add the counts of another table to this one
    pub fn merge(&mut self, other: &Self) {
        for (label, count) in other.iter() {
            self.add_count(label, count);
        }
    }

    /// Labels by decreasing count, ties in order of first occurence
    pub fn most_common(&self, limit: Option<NonZeroUsize>) -> Vec<(&str, u64)> {
        top::most_common(self.iter(), limit)
    }
}
