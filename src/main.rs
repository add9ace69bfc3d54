use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use bzip2::read::BzDecoder;
use clap::Parser;

use langrevs::scanner::{DumpScanner, ScanOptions, ScanStats};

#[derive(Debug, clap::Parser)]
#[command(version, about = "Report, per page, how many revisions of a MediaWiki dump contain a section for one language")]
struct CommandLine {
    /// Language whose section header to look for, e.g. "Polish".
    language: String,

    /// Dump file to scan; reads standard input when omitted. Files ending
    /// in .bz2 are decompressed on the fly.
    input_file: Option<PathBuf>,

    /// Only report pages with at least one revision containing the language.
    #[arg(long)]
    language_only: bool,

    /// Add a column with the total number of revisions per page.
    #[arg(long)]
    show_total_revs: bool,

    /// Report every page, even without any matching revision.
    #[arg(long)]
    all: bool,

    /// Log lines that almost look like a language header.
    #[arg(long)]
    debug: bool,

    /// Emit a heartbeat to stderr every 10 million input lines.
    #[arg(long)]
    progress: bool,
}

fn main() -> ExitCode {
    let args = CommandLine::parse();

    let max_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();

    let options = ScanOptions {
        language: args.language,
        language_only: args.language_only,
        show_total_revisions: args.show_total_revs,
        show_all_pages: args.all,
        progress: args.progress,
    };

    let scanner = match DumpScanner::new(options) {
        Ok(scanner) => scanner,
        Err(error) => {
            tracing::error!(error = %error, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let mut out = BufWriter::new(io::stdout().lock());

    let result = match &args.input_file {
        None => scanner.run(io::stdin().lock(), &mut out),
        Some(path) => {
            let file = match File::open(path) {
                Ok(file) => file,
                Err(error) => {
                    tracing::error!(error = %error, path = %path.display(), "cannot open dump");
                    return ExitCode::FAILURE;
                }
            };
            if path.extension().is_some_and(|ext| ext == "bz2") {
                let decoder = BzDecoder::new(BufReader::new(file));
                scanner.run(BufReader::new(decoder), &mut out)
            } else {
                scanner.run(BufReader::new(file), &mut out)
            }
        }
    };

    let stats: ScanStats = match result {
        Ok(stats) => stats,
        Err(error) => {
            tracing::error!(error = %error, "scan failed");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = out.flush() {
        tracing::error!(error = %error, "scan failed");
        return ExitCode::FAILURE;
    }

    tracing::debug!(
        lines = stats.lines,
        pages_closed = stats.pages_closed,
        pages_reported = stats.pages_reported,
        anomalies = stats.anomalies,
        truncated = stats.truncated,
        "scan complete"
    );
    ExitCode::SUCCESS
}
