// SPDX-License-Identifier: MPL-2.0
//! # langrevs
//!
//! Streaming analysis of MediaWiki/Wiktionary XML export dumps: report, per
//! page, how many of its revisions contain wikitext for one language section
//! (e.g. `==Polish==`).
//!
//! ## Overview
//!
//! Full-history dumps run to billions of lines, so everything here is built
//! around a single forward pass with constant memory. The dump is treated as
//! a line stream, not as XML: page and revision boundaries are tracked by
//! line-level marker containment, which matches how the dumps are laid out
//! and is orders of magnitude cheaper than real XML parsing. The cost is a
//! little accepted noise (a header repeated verbatim inside a `<comment>`
//! element counts like a body line), which the once-per-revision latch keeps
//! bounded.
//!
//! The pipeline is three small pieces composed by [`scanner::DumpScanner`]:
//!
//! - [`line_source::LineSource`] — lazy, forward-only line reader over any
//!   [`BufRead`](std::io::BufRead), with reused buffers.
//! - [`detector::LanguageDetector`] — pure predicate for "is this line a
//!   top-level header for the target language?", two-tiered so the expensive
//!   structural regex only runs on lines that contain the bare language name.
//! - [`report::ReportEmitter`] — formats one aligned report line per
//!   completed page.
//!
//! ## Basic usage
//!
//! ```no_run
//! use std::io::{self, BufWriter};
//!
//! use langrevs::scanner::{DumpScanner, ScanOptions};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ScanOptions {
//!         language: "Polish".to_string(),
//!         language_only: true,
//!         show_total_revisions: true,
//!         show_all_pages: false,
//!         progress: false,
//!     };
//!
//!     let scanner = DumpScanner::new(options)?;
//!     let mut out = BufWriter::new(io::stdout().lock());
//!     let stats = scanner.run(io::stdin().lock(), &mut out)?;
//!
//!     eprintln!("{} of {} pages reported", stats.pages_reported, stats.pages_closed);
//!     Ok(())
//! }
//! ```
//!
//! Decompression is the caller's job (`bzcat dump.xml.bz2 | langrevs Polish`
//! or the binary's built-in `.bz2` handling); the scanner only ever sees
//! decoded lines.
//!
//! ## Malformed input
//!
//! Dumps contain vandalized and partially corrupt pages, so structural
//! anomalies (markers out of nesting order) are never fatal: they are logged
//! through `tracing` and the scan continues with best-effort state. The only
//! runtime errors are real I/O failures. A stream that ends mid-page drops
//! that page from the report instead of emitting understated counts.
//!
//! Diagnostics (anomalies, the optional progress heartbeat, near-miss header
//! lines at DEBUG) go to the `tracing` subscriber, never to the report
//! stream, so the report stays machine-parseable.

pub mod detector;
pub mod line_source;
pub mod report;
pub mod scanner;
