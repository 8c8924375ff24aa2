//! Interactive query loop.
//!
//! A line-oriented read loop over any `BufRead`/`Write` pair:
//!
//! | Input | Action |
//! |-------|--------|
//! | `quit`, `exit`, `q` (any case), or end of input | leave the session |
//! | blank line | re-prompt |
//! | `?<question>` | retrieval-augmented answer via [`AnswerSynthesizer`] |
//! | anything else | similarity search via [`RetrievalEngine`] |
//!
//! Each turn is resolved completely (embed, search, optionally generate,
//! render) before the next prompt is shown.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use corpus_rag_core::models::SearchResult;

use crate::answer::AnswerSynthesizer;
use crate::config::{Config, RetrievalConfig};
use crate::engine::{open_engine, RetrievalEngine};
use crate::generation::create_generator;
use crate::ingest::ingest_file;
use crate::progress::ProgressMode;

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    Blank,
    /// `?` with nothing after it.
    MissingQuestion,
    Ask(String),
    Search(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if matches!(trimmed.to_lowercase().as_str(), "quit" | "exit" | "q") {
        return Command::Quit;
    }
    if trimmed.is_empty() {
        return Command::Blank;
    }
    match trimmed.strip_prefix('?') {
        Some(rest) if rest.trim().is_empty() => Command::MissingQuestion,
        Some(rest) => Command::Ask(rest.trim().to_string()),
        None => Command::Search(trimmed.to_string()),
    }
}

/// ANSI styling, disabled when output is not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Style {
    const YELLOW: &'static str = "\x1b[93m";
    const GREEN: &'static str = "\x1b[92m";
    const CYAN: &'static str = "\x1b[96m";
    const BOLD: &'static str = "\x1b[1m";
    const RESET: &'static str = "\x1b[0m";

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Colour when stdout is a TTY.
    pub fn for_stdout() -> Self {
        Self::new(atty::is(atty::Stream::Stdout))
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}", code, text, Self::RESET)
        } else {
            text.to_string()
        }
    }

    fn prompt(&self, text: &str) -> String {
        self.paint(Self::YELLOW, text)
    }

    fn info(&self, text: &str) -> String {
        self.paint(Self::GREEN, text)
    }

    fn title(&self, text: &str) -> String {
        if self.enabled {
            format!("{}{}{}{}", Self::BOLD, Self::CYAN, text, Self::RESET)
        } else {
            text.to_string()
        }
    }
}

/// Presentation settings for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub search_k: usize,
    pub preview_chars: usize,
    pub confirm_full_text: bool,
}

impl From<&RetrievalConfig> for SessionOptions {
    fn from(cfg: &RetrievalConfig) -> Self {
        Self {
            search_k: cfg.search_k,
            preview_chars: cfg.preview_chars,
            confirm_full_text: cfg.confirm_full_text,
        }
    }
}

pub struct InteractiveSession<R, W> {
    engine: Arc<RetrievalEngine>,
    answerer: AnswerSynthesizer,
    options: SessionOptions,
    style: Style,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> InteractiveSession<R, W> {
    pub fn new(
        engine: Arc<RetrievalEngine>,
        answerer: AnswerSynthesizer,
        options: SessionOptions,
        input: R,
        output: W,
    ) -> Self {
        Self {
            engine,
            answerer,
            options,
            style: Style::new(false),
            input,
            output,
        }
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Run until the user quits or input ends.
    pub async fn run(&mut self) -> Result<()> {
        self.banner()?;

        loop {
            let prompt = self.style.prompt("Your query:");
            write!(self.output, "\n{} ", prompt)?;
            self.output.flush()?;

            let line = match self.read_line()? {
                Some(line) => line,
                None => {
                    writeln!(self.output)?;
                    break;
                }
            };

            match parse_command(&line) {
                Command::Quit => break,
                Command::Blank => {
                    writeln!(self.output, "{}", self.style.prompt("Please enter a valid query."))?;
                }
                Command::MissingQuestion => {
                    writeln!(
                        self.output,
                        "{}",
                        self.style.prompt("Please provide a question after '?'")
                    )?;
                }
                Command::Ask(question) => self.ask(&question).await?,
                Command::Search(query) => self.search(&query).await?,
            }
        }

        writeln!(self.output, "{}", self.style.info("Exiting search. Goodbye!"))?;
        self.output.flush()?;
        Ok(())
    }

    fn banner(&mut self) -> Result<()> {
        writeln!(
            self.output,
            "\n{}",
            self.style.title("===== Interactive Corpus Search =====")
        )?;
        writeln!(
            self.output,
            "{}",
            self.style
                .info("Enter a query to search the indexed corpus, or type 'quit' to exit.")
        )?;
        writeln!(
            self.output,
            "{}",
            self.style
                .info("Start your query with '?' to get an answer generated from the corpus.")
        )?;
        Ok(())
    }

    async fn ask(&mut self, question: &str) -> Result<()> {
        writeln!(
            self.output,
            "\n{}",
            self.style
                .prompt("Analyzing the corpus and answering your question...")
        )?;
        self.output.flush()?;

        let started = Instant::now();
        let answer = self.answerer.answer(question).await;
        let elapsed = started.elapsed().as_secs_f64();

        let header = format!("----- Answer (generated in {:.2}s) -----", elapsed);
        writeln!(self.output, "\n{}", self.style.prompt(&header))?;
        writeln!(self.output, "{}", answer)?;
        writeln!(self.output, "\n{}", self.style.prompt(&"-".repeat(50)))?;
        Ok(())
    }

    async fn search(&mut self, query: &str) -> Result<()> {
        writeln!(
            self.output,
            "\n{}",
            self.style.prompt("Searching for relevant chunks...")
        )?;
        self.output.flush()?;

        let started = Instant::now();
        let results = self.engine.search(query, self.options.search_k).await;
        let elapsed = started.elapsed().as_secs_f64();

        if results.is_empty() {
            writeln!(
                self.output,
                "{}",
                self.style
                    .prompt("No relevant results found. Try a different query.")
            )?;
            return Ok(());
        }

        let header = format!("----- Search Results (found in {:.2}s) -----", elapsed);
        writeln!(self.output, "\n{}", self.style.prompt(&header))?;

        for (i, result) in results.iter().enumerate() {
            self.render_result(i + 1, result)?;
        }
        writeln!(self.output, "\n{}", "-".repeat(50))?;
        Ok(())
    }

    fn render_result(&mut self, rank: usize, result: &SearchResult) -> Result<()> {
        let header = format!(
            "Result {} (Similarity: {:.2}, chunk {})",
            rank, result.similarity, result.chunk_id
        );
        writeln!(self.output, "\n{}", self.style.prompt(&header))?;
        writeln!(self.output, "{}", self.style.prompt(&"-".repeat(50)))?;

        let (preview, truncated) = preview(&result.text, self.options.preview_chars);
        writeln!(self.output, "{}", preview)?;

        if truncated && self.options.confirm_full_text {
            let ask = self.style.prompt("See full content? (y/n):");
            write!(self.output, "\n{} ", ask)?;
            self.output.flush()?;

            let reply = self.read_line()?.unwrap_or_default();
            if matches!(reply.trim().to_lowercase().as_str(), "y" | "yes") {
                writeln!(self.output, "\n{} FULL CONTENT {}", "=".repeat(30), "=".repeat(30))?;
                writeln!(self.output, "{}", result.text)?;
                writeln!(self.output, "{}", "=".repeat(74))?;
            }
        }
        Ok(())
    }

    /// Next input line without its terminator, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// `crag session`: interactive loop on stdin/stdout.
///
/// With `corpus`, a missing index is built from that file first.
pub async fn run_session(
    config: &Config,
    corpus: Option<&Path>,
    progress: ProgressMode,
) -> Result<()> {
    let engine = open_engine(config)?;
    if let Some(path) = corpus {
        if !engine.store().exists() {
            tracing::info!(corpus = %path.display(), "no index found, ingesting corpus");
            let report = ingest_file(&engine, path, progress).await?;
            println!(
                "Indexed {} chunks from {} in {:.2}s",
                report.chunks,
                path.display(),
                report.elapsed_secs
            );
        }
    } else if !engine.store().exists() {
        tracing::warn!(
            dir = %engine.store().dir().display(),
            "no index found; searches will return nothing until `crag ingest` runs"
        );
    }

    let generator = create_generator(&config.generation)?;
    let answerer = AnswerSynthesizer::new(
        Arc::clone(&engine),
        generator,
        config.retrieval.answer_k,
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut session = InteractiveSession::new(
        engine,
        answerer,
        SessionOptions::from(&config.retrieval),
        stdin.lock(),
        stdout.lock(),
    )
    .with_style(Style::for_stdout());
    session.run().await
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (format!("{}...", &text[..cut]), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quit_variants() {
        for word in ["quit", "exit", "q", "  QUIT ", "Exit"] {
            assert_eq!(parse_command(word), Command::Quit, "{:?}", word);
        }
    }

    #[test]
    fn test_parse_blank() {
        assert_eq!(parse_command(""), Command::Blank);
        assert_eq!(parse_command("   \t"), Command::Blank);
    }

    #[test]
    fn test_parse_question() {
        assert_eq!(
            parse_command("  ? how is data stored?  "),
            Command::Ask("how is data stored?".to_string())
        );
        assert_eq!(parse_command("?"), Command::MissingQuestion);
        assert_eq!(parse_command("?   "), Command::MissingQuestion);
    }

    #[test]
    fn test_parse_search() {
        assert_eq!(
            parse_command(" member repository "),
            Command::Search("member repository".to_string())
        );
        // Only a leading '?' routes to the answerer
        assert_eq!(
            parse_command("why?"),
            Command::Search("why?".to_string())
        );
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("héllo wörld", 5), ("héllo...".to_string(), true));
        assert_eq!(preview("short", 5), ("short".to_string(), false));
        assert_eq!(preview("short", 300), ("short".to_string(), false));
    }

    #[test]
    fn test_style_disabled_is_plain() {
        let style = Style::new(false);
        assert_eq!(style.prompt("x"), "x");
        assert!(Style::new(true).prompt("x").starts_with("\x1b["));
    }
}
