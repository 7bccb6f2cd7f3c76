//! Annotate CLI Binary
//!
//! Converts annotated corpora between JSON, `.docx` and `.xlsx`, renders
//! highlighted passages and reports which citations occur in their text.

use annotation_core::{
    export, import, AnnotateConfig, Corpus, Format, HighlightStyle, Highlighter, MarkedText,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "annotate")]
#[command(version, about = "Citation annotations for text passages")]
struct Args {
    /// TOML configuration file (defaults to $ANNOTATE_CONFIG, then built-ins)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the sample corpus (or a single default passage) to a file
    Init {
        output: PathBuf,
        /// Start from one passage with the configured default text
        #[arg(long)]
        blank: bool,
    },
    /// Convert a corpus between formats, picked by file extension
    Convert { input: PathBuf, output: PathBuf },
    /// Print passage, annotation, word and found-citation counts
    Stats {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print passages with their citations highlighted
    Render {
        input: PathBuf,
        #[arg(short, long, value_enum, default_value = "plain")]
        style: StyleArg,
        /// Only this passage (zero-based)
        #[arg(short, long)]
        passage: Option<usize>,
    },
    /// List every annotation with its "found in text" flag
    Check {
        input: PathBuf,
        /// Exit with an error when any citation is missing from its passage
        #[arg(long)]
        strict: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StyleArg {
    Html,
    Runs,
    Plain,
}

impl From<StyleArg> for HighlightStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Html => HighlightStyle::Inline,
            StyleArg::Runs => HighlightStyle::Runs,
            StyleArg::Plain => HighlightStyle::Delimited,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries command output, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => AnnotateConfig::from_file(path)?,
        None => AnnotateConfig::from_env()?,
    };
    tracing::debug!("Using configuration: {:?}", config);

    match args.command {
        Command::Init { output, blank } => {
            let corpus = if blank {
                let mut corpus = Corpus::new();
                corpus.add_configured_passage(&config);
                corpus
            } else {
                Corpus::sample()
            };
            write_corpus(&output, &corpus, &config)?;
        }
        Command::Convert { input, output } => {
            let corpus = read_corpus(&input)?;
            write_corpus(&output, &corpus, &config)?;
        }
        Command::Stats { input, json } => {
            let corpus = read_corpus(&input)?;
            println!("{}", stats_report(&corpus, json)?);
        }
        Command::Render {
            input,
            style,
            passage,
        } => {
            let corpus = read_corpus(&input)?;
            let highlighter = Highlighter::new(config.highlight.clone());
            print!("{}", render_report(&corpus, &highlighter, style.into(), passage)?);
        }
        Command::Check { input, strict } => {
            let corpus = read_corpus(&input)?;
            let (report, missing) = check_report(&corpus);
            print!("{}", report);
            if strict && missing > 0 {
                bail!("{} citation(s) not found in their passage", missing);
            }
        }
    }

    Ok(())
}

fn read_corpus(path: &Path) -> anyhow::Result<Corpus> {
    let format = Format::from_path(path)?;
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read corpus: {}", path.display()))?;
    import(format, &bytes).with_context(|| format!("Failed to import {}", path.display()))
}

fn write_corpus(path: &Path, corpus: &Corpus, config: &AnnotateConfig) -> anyhow::Result<()> {
    let format = Format::from_path(path)?;
    let exported = export(format, corpus, config)?;
    fs::write(path, &exported.bytes)
        .with_context(|| format!("Failed to write corpus: {}", path.display()))?;
    tracing::info!(
        "Wrote {} ({}, {} bytes)",
        path.display(),
        exported.content_type,
        exported.bytes.len()
    );
    Ok(())
}

fn stats_report(corpus: &Corpus, json: bool) -> anyhow::Result<String> {
    let stats = corpus.stats();
    if json {
        return Ok(serde_json::to_string_pretty(&stats)?);
    }
    Ok(format!(
        "passages: {}\nannotations: {}\nwords: {}\ncitations found: {}",
        stats.passages, stats.annotations, stats.words, stats.citations_found
    ))
}

fn render_report(
    corpus: &Corpus,
    highlighter: &Highlighter,
    style: HighlightStyle,
    only: Option<usize>,
) -> anyhow::Result<String> {
    if let Some(position) = only {
        if position >= corpus.len() {
            bail!(
                "passage {} out of range (corpus has {})",
                position,
                corpus.len()
            );
        }
    }

    let mut out = String::new();
    for (position, text, _) in corpus.iter() {
        if only.is_some_and(|p| p != position) {
            continue;
        }
        let marked = highlighter.highlight(text, corpus.citations(position), style);
        let body = match marked {
            MarkedText::Inline { html } => html,
            MarkedText::Runs { runs } => serde_json::to_string(&runs)?,
            MarkedText::Delimited(delimited) => delimited.text,
        };
        out.push_str(&format!("[{}] {}\n", position, body));
    }
    Ok(out)
}

/// Per-annotation found flags; returns the report and the number missing
fn check_report(corpus: &Corpus) -> (String, usize) {
    let mut out = String::new();
    let mut missing = 0;
    for position in 0..corpus.len() {
        for view in corpus.annotation_views(position) {
            if view.citation.trim().is_empty() {
                continue;
            }
            let mark = if view.found_in_text {
                "found"
            } else {
                missing += 1;
                "MISSING"
            };
            out.push_str(&format!("[{}] {:<8} {}\n", position, mark, view.citation));
        }
    }
    (out, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use annotation_core::{Annotation, AnnotationField};
    use pretty_assertions::assert_eq;

    fn fox() -> Corpus {
        let mut corpus = Corpus::from_passages(["Der Fuchs springt.", "Der Hund schläft."]);
        corpus.replace_annotations(
            0,
            vec![Annotation::new("Fuchs", "", ""), Annotation::new("Wolf", "", "")],
        );
        corpus
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["annotate", "render", "in.json", "-s", "html", "-p", "1"])
            .unwrap();
        match args.command {
            Command::Render {
                style, passage, ..
            } => {
                assert_eq!(style, StyleArg::Html);
                assert_eq!(passage, Some(1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_check_report_counts_missing() {
        let mut corpus = fox();
        corpus.add_annotation(1);
        corpus.set_annotation_field(1, 0, AnnotationField::Citation, "Hund");
        let (report, missing) = check_report(&corpus);
        assert_eq!(missing, 1);
        assert_eq!(
            report,
            "[0] found    Fuchs\n[0] MISSING  Wolf\n[1] found    Hund\n"
        );
    }

    #[test]
    fn test_render_plain() {
        let highlighter = Highlighter::default();
        let out = render_report(&fox(), &highlighter, HighlightStyle::Delimited, None).unwrap();
        assert_eq!(out, "[0] Der **Fuchs** springt.\n[1] Der Hund schläft.\n");

        let only = render_report(&fox(), &highlighter, HighlightStyle::Delimited, Some(1)).unwrap();
        assert_eq!(only, "[1] Der Hund schläft.\n");
        assert!(render_report(&fox(), &highlighter, HighlightStyle::Delimited, Some(2)).is_err());
    }

    #[test]
    fn test_stats_report() {
        let text = stats_report(&fox(), false).unwrap();
        assert_eq!(
            text,
            "passages: 2\nannotations: 2\nwords: 6\ncitations found: 1"
        );
        let json: serde_json::Value = serde_json::from_str(&stats_report(&fox(), true).unwrap()).unwrap();
        assert_eq!(json["citations_found"], 1);
    }
}
