use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::sync::LazyLock;

use compact_str::CompactString;
use memchr::memmem;
use regex::Regex;

use crate::detector::{LanguageDetector, PatternError};
use crate::line_source::{Line, LineSource};
use crate::report::{PageSummary, ReportEmitter};

/// Lines between progress heartbeats on the diagnostic stream.
const HEARTBEAT_INTERVAL: u64 = 10_000_000;

/// Title used for a page until its `<title>` element is seen.
const NO_TITLE_YET: &str = "<no title yet>";

macro_rules! finder {
    ($needle:expr) => {{
        static FINDER: LazyLock<memmem::Finder> =
            LazyLock::new(|| memmem::Finder::new($needle.as_bytes()));
        &FINDER
    }};
}

static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<title>(.+)</title>").unwrap());

/// Configuration for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Language whose section header to look for, e.g. `Polish`. Spliced
    /// verbatim into the header pattern, see [`LanguageDetector::new`].
    pub language: String,
    /// Suppress pages without any revision containing the language.
    pub language_only: bool,
    /// Add the total revision count column to every report line.
    pub show_total_revisions: bool,
    /// Report every page, overriding `language_only`.
    pub show_all_pages: bool,
    /// Emit a heartbeat to the diagnostic stream every 10 million lines.
    pub progress: bool,
}

/// Counters describing a finished scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Input lines consumed.
    pub lines: u64,
    /// Pages whose closing marker was seen.
    pub pages_closed: u64,
    /// Summaries actually written to the report.
    pub pages_reported: u64,
    /// Structural anomalies recovered from.
    pub anomalies: u64,
    /// The stream ended while a page was still open; its partial counts
    /// were dropped.
    pub truncated: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to read from the dump stream")]
    Read(#[source] io::Error),
    #[error("failed to write a report line")]
    Write(#[source] io::Error),
}

/// Mutable state scoped to one `<page>…</page>` span.
#[derive(Debug)]
struct PageContext {
    title: CompactString,
    total_revisions: u64,
    revisions_with_language: u64,
}

impl PageContext {
    fn new() -> Self {
        Self {
            title: CompactString::from(NO_TITLE_YET),
            total_revisions: 0,
            revisions_with_language: 0,
        }
    }
}

/// Mutable state scoped to one `<revision>…</revision>` span.
#[derive(Debug, Default)]
struct RevisionContext {
    /// Sticky latch: once a revision has been counted, later headers in the
    /// same revision are ignored (and the detector is not consulted at all).
    language_found_once: bool,
}

/// Nesting state. Context data lives inside the variants, so "at most one
/// open page/revision" holds by construction.
#[derive(Debug, Default)]
enum ScanState {
    #[default]
    Idle,
    InPage(PageContext),
    InRevision(PageContext, RevisionContext),
}

/// The streaming state machine.
///
/// Consumes one line at a time, tracks page/revision nesting via line-level
/// marker containment (deliberately not an XML parser; dumps put each marker
/// on its own line) and writes one [`PageSummary`] per completed page.
/// Malformed nesting is reported to the diagnostic stream and recovered
/// from; the scan itself only fails on I/O errors.
pub struct DumpScanner {
    options: ScanOptions,
    detector: LanguageDetector,
    emitter: ReportEmitter,
    state: ScanState,
    lines: u64,
    pages_closed: u64,
    pages_reported: u64,
    anomalies: u64,
    truncated: bool,
}

impl DumpScanner {
    pub fn new(options: ScanOptions) -> Result<Self, PatternError> {
        let detector = LanguageDetector::new(&options.language)?;
        let emitter = ReportEmitter::new(options.show_total_revisions);

        Ok(Self {
            options,
            detector,
            emitter,
            state: ScanState::Idle,
            lines: 0,
            pages_closed: 0,
            pages_reported: 0,
            anomalies: 0,
            truncated: false,
        })
    }

    /// Drive a whole scan: read `reader` to end of stream, write report
    /// lines to `out`, finish, and return the counters.
    pub fn run<R: BufRead, W: Write>(
        mut self,
        reader: R,
        out: &mut W,
    ) -> Result<ScanStats, ScanError> {
        let mut source = LineSource::new(reader);
        loop {
            let line = match source.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(error) => return Err(ScanError::Read(error)),
            };
            self.process_line(line, out).map_err(ScanError::Write)?;
        }
        Ok(self.finish())
    }

    /// Feed one line through the state machine.
    ///
    /// The checks are ordered by marker priority; in well-formed input a
    /// line carries at most one marker, and a candidate body line that fails
    /// the header match still falls through to the `</revision>` check.
    pub fn process_line<W: Write>(&mut self, line: Line<'_>, out: &mut W) -> io::Result<()> {
        self.lines = line.ordinal;
        if self.options.progress && line.ordinal % HEARTBEAT_INTERVAL == 0 {
            tracing::info!(message = "scan progress", lines = line.ordinal);
        }

        let text = line.text;
        let bytes = text.as_bytes();

        if finder!("<page>").find(bytes).is_some() {
            self.on_page_open();
        } else if finder!("</page>").find(bytes).is_some() {
            self.on_page_close(line.ordinal, out)?;
        } else if let Some(captures) = TITLE.captures(text) {
            self.on_title(line.ordinal, captures.get(1).unwrap().as_str());
        } else if finder!("<revision>").find(bytes).is_some() {
            self.on_revision_open(line.ordinal);
        } else if self.try_match_language(text) {
            // counted inside
        } else if finder!("</revision>").find(bytes).is_some() {
            self.on_revision_close(line.ordinal);
        }

        Ok(())
    }

    /// Close out the scan. Any still-open page is dropped rather than
    /// reported with partial counts, which would silently understate its
    /// revision totals.
    pub fn finish(&mut self) -> ScanStats {
        if let ScanState::InPage(page) | ScanState::InRevision(page, _) =
            std::mem::take(&mut self.state)
        {
            self.truncated = true;
            tracing::warn!(
                message = "input ended inside an open page, dropping its partial counts",
                title = page.title.as_str(),
                revisions_seen = page.total_revisions
            );
        }

        ScanStats {
            lines: self.lines,
            pages_closed: self.pages_closed,
            pages_reported: self.pages_reported,
            anomalies: self.anomalies,
            truncated: self.truncated,
        }
    }

    fn on_page_open(&mut self) {
        // a new page resets everything; an unterminated previous page is
        // abandoned, matching the close-marker-drives-output model
        self.state = ScanState::InPage(PageContext::new());
    }

    fn on_page_close<W: Write>(&mut self, ordinal: u64, out: &mut W) -> io::Result<()> {
        match std::mem::take(&mut self.state) {
            ScanState::Idle => {
                self.anomalies += 1;
                tracing::warn!(
                    message = "found a page close marker outside any page",
                    line = ordinal
                );
                Ok(())
            }
            ScanState::InPage(page) | ScanState::InRevision(page, _) => {
                self.pages_closed += 1;

                let wanted = self.options.show_all_pages
                    || !self.options.language_only
                    || page.revisions_with_language > 0;
                if !wanted {
                    return Ok(());
                }

                let summary = PageSummary {
                    ordinal: self.pages_reported,
                    title: page.title,
                    revisions_with_language: page.revisions_with_language,
                    total_revisions: page.total_revisions,
                };
                self.emitter.emit(out, &summary)?;
                self.pages_reported += 1;
                Ok(())
            }
        }
    }

    fn on_title(&mut self, ordinal: u64, raw: &str) {
        match &mut self.state {
            ScanState::Idle => {
                self.anomalies += 1;
                tracing::warn!(
                    message = "found a title outside any page",
                    line = ordinal,
                    title = raw
                );
            }
            ScanState::InPage(page) | ScanState::InRevision(page, _) => {
                let decoded = decode_title_entities(raw);
                page.title = CompactString::from(decoded.as_ref());
                page.total_revisions = 0;
            }
        }
    }

    fn on_revision_open(&mut self, ordinal: u64) {
        match std::mem::take(&mut self.state) {
            ScanState::Idle => {
                self.anomalies += 1;
                tracing::warn!(
                    message = "found a revision marker outside any page",
                    line = ordinal
                );
            }
            ScanState::InPage(mut page) => {
                page.total_revisions += 1;
                self.state = ScanState::InRevision(page, RevisionContext::default());
            }
            ScanState::InRevision(mut page, _) => {
                // unterminated revision; the new marker implicitly closes it
                page.total_revisions += 1;
                self.state = ScanState::InRevision(page, RevisionContext::default());
            }
        }
    }

    /// Candidate check for a revision body line. Returns `true` only when a
    /// header was found and counted, so that non-matching lines keep
    /// flowing to the remaining marker checks.
    fn try_match_language(&mut self, text: &str) -> bool {
        let ScanState::InRevision(page, revision) = &mut self.state else {
            return false;
        };
        if revision.language_found_once || !self.detector.matches(text) {
            return false;
        }

        page.revisions_with_language += 1;
        revision.language_found_once = true;
        true
    }

    fn on_revision_close(&mut self, ordinal: u64) {
        match std::mem::take(&mut self.state) {
            ScanState::Idle => {
                self.anomalies += 1;
                tracing::warn!(
                    message = "found a revision close marker outside any page",
                    line = ordinal
                );
            }
            ScanState::InPage(page) => {
                self.anomalies += 1;
                tracing::warn!(
                    message = "found a revision close marker without an open revision",
                    line = ordinal,
                    title = page.title.as_str()
                );
                self.state = ScanState::InPage(page);
            }
            ScanState::InRevision(page, _) => {
                self.state = ScanState::InPage(page);
            }
        }
    }
}

/// Decode the two entities the dump format uses in titles.
fn decode_title_entities(title: &str) -> Cow<'_, str> {
    if !title.contains('&') {
        return Cow::Borrowed(title);
    }
    Cow::Owned(title.replace("&quot;", "\"").replace("&amp;", "&"))
}
