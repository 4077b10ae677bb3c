//! Corpus comparison report
//!
//! Every corpus is tagged and counted, then its part-of-speech distribution
//! and most common lemmas are printed. When several corpora are analyzed,
//! their part-of-speech distributions are also compared on a chart.

use crate::{
    batch::BatchSummary,
    config::AnalyzeConfig,
    plot::{ChartRenderer, GroupedBarChart, SvgRenderer},
    progress::ProgressReport,
    stats::{self, CorpusCounts, FrequencyTable},
    tagger::CommandTagger,
    Result,
};
use std::{
    io::{self, Write},
    num::NonZeroUsize,
};

/// Tags whose share is charted, with their display names
const CHARTED_TAGS: [(&str, &str); 5] = [
    ("NOUN", "Noun"),
    ("VERB", "Verb"),
    ("ADJ", "Adjective"),
    ("ADV", "Adverb"),
    ("PRON", "Pronoun"),
];

/// Display name of the share of all other tags
const OTHER_TAGS: &str = "Other";

/// Analyze every corpus, print the report and draw the comparison chart
pub fn run(config: &AnalyzeConfig, report: &ProgressReport) -> Result<()> {
    let mut tagger = CommandTagger::from_config(config);
    let mut results = Vec::with_capacity(config.corpora.len());
    for corpus in config.corpora.iter() {
        let (counts, summary) = stats::analyze_corpus(&corpus.dir, &mut tagger, report)?;
        results.push((&*corpus.label, counts, summary));
    }

    // Progress bars are gone, we can print now
    let mut stdout = io::stdout().lock();
    for (label, counts, summary) in &results {
        print_corpus(&mut stdout, label, counts, summary, config.top)?;
    }

    if results.len() > 1 {
        let series = results
            .iter()
            .map(|(label, counts, _)| (*label, &counts.pos))
            .collect::<Vec<_>>();
        SvgRenderer::default().render(&pos_chart(&series), &config.chart_path)?;
        writeln!(stdout, "Plots saved in {}", config.chart_path.display())?;
    }
    Ok(())
}

/// Print the report of one corpus, under a heading
fn print_corpus(
    out: &mut impl Write,
    label: &str,
    counts: &CorpusCounts,
    summary: &BatchSummary,
    top: NonZeroUsize,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{label}:")?;
    writeln!(out)?;
    print_counts(out, counts, top)?;
    if !summary.skipped().is_empty() {
        writeln!(out)?;
        writeln!(out, "{summary}")?;
    }
    Ok(())
}

/// Print part-of-speech frequencies and the most common lemmas of each
/// word class
pub fn print_counts(
    out: &mut impl Write,
    counts: &CorpusCounts,
    top: NonZeroUsize,
) -> io::Result<()> {
    writeln!(out, "POS frequencies:")?;
    let total = counts.pos.total();
    for (tag, count) in counts.pos.most_common(None) {
        writeln!(out, "{:2.0}% {tag}", percentage(count, total))?;
    }

    for (class, table) in [
        ("adjectives", &counts.adj),
        ("nouns", &counts.noun),
        ("verbs", &counts.verb),
    ] {
        writeln!(out)?;
        writeln!(out, "The most common {class}:")?;
        for (lemma, count) in table.most_common(Some(top)) {
            writeln!(out, "{count:>6} {lemma}")?;
        }
    }
    Ok(())
}

/// Share of the main parts of speech among all tokens, in percent
///
/// The last share gathers every other part of speech, so that shares add up
/// to 100%. Nothing is returned if no token was counted.
pub fn pos_shares(pos: &FrequencyTable) -> Vec<(&'static str, f64)> {
    let total = pos.total();
    if total == 0 {
        return Vec::new();
    }
    let mut shares = CHARTED_TAGS
        .iter()
        .map(|&(tag, name)| (name, percentage(pos.get(tag), total)))
        .collect::<Vec<_>>();
    let other = 100.0 - shares.iter().map(|(_, share)| share).sum::<f64>();
    shares.push((OTHER_TAGS, other));
    shares
}

/// Part-of-speech comparison chart of several corpora
///
/// Corpora without any token get empty bars.
fn pos_chart<'a>(corpora: &[(&'a str, &FrequencyTable)]) -> GroupedBarChart<'a> {
    let categories = CHARTED_TAGS
        .iter()
        .map(|&(_, name)| name)
        .chain([OTHER_TAGS])
        .collect::<Vec<_>>();
    let series = corpora
        .iter()
        .map(|&(label, pos)| {
            let mut values = pos_shares(pos)
                .into_iter()
                .map(|(_, share)| share)
                .collect::<Vec<_>>();
            values.resize(categories.len(), 0.0);
            (label, values)
        })
        .collect();
    GroupedBarChart {
        x_label: "POS",
        y_label: "frequency (%)",
        categories,
        series,
    }
}

/// `count` as a percentage of `total`
fn percentage(count: u64, total: u64) -> f64 {
    count as f64 / total as f64 * 100.0
}
