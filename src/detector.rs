use memchr::memmem;
use regex::Regex;

/// Error returned when the configured language name does not compile into a
/// header pattern.
///
/// The name is spliced into the pattern verbatim, so a name containing an
/// unbalanced regex metacharacter (e.g. `(`) is rejected here, at startup,
/// instead of corrupting every match during the scan.
#[derive(Debug, thiserror::Error)]
#[error("cannot compile a header pattern for language `{language}`")]
pub struct PatternError {
    language: String,
    #[source]
    source: regex::Error,
}

/// Decides whether a line is a top-level language-section header, e.g.
/// `==Polish==`.
///
/// Matching is two-tiered, and both tiers are a performance contract: the
/// structural regex is too expensive to run on every body line of a dump, so
/// [`matches`](LanguageDetector::matches) first runs a cheap substring search
/// for the bare language name and only consults the regex when that hits.
/// Callers are expected to add the third tier themselves by not calling
/// `matches` again once a revision has been counted.
pub struct LanguageDetector {
    name: memmem::Finder<'static>,
    header: Regex,
}

impl LanguageDetector {
    /// Build a detector for one language.
    ///
    /// The name is inserted into the pattern without escaping, so regex
    /// metacharacters change the matching semantics. The substring gate
    /// always searches for the literal name, pattern or not.
    pub fn new(language: &str) -> Result<Self, PatternError> {
        // Accepted shapes: ==Polish==, == Polish ==, ==[[Polish]]==,
        // == [[Polish]] ==. The guards on both sides keep ===Polish=== and
        // combined headers like ==Polish and Russian== out; anything after
        // the closing guard character is tolerated.
        let pattern = format!(r"(^|[^=])==\s*(\[\[{language}\]\]|{language})\s*==([^=]|$)");
        let header = Regex::new(&pattern).map_err(|source| PatternError {
            language: language.to_string(),
            source,
        })?;

        Ok(Self {
            name: memmem::Finder::new(language.as_bytes()).into_owned(),
            header,
        })
    }

    /// Does this line contain a header for the configured language?
    pub fn matches(&self, line: &str) -> bool {
        if self.name.find(line.as_bytes()).is_none() {
            return false;
        }
        if self.header.is_match(line) {
            return true;
        }

        // the name is present but the header shape is not; surface near
        // misses so formatting oddities in a dump can be inspected
        if line.contains("==") {
            tracing::debug!(
                message = "line contains the language name and `==` but no well-formed header",
                line
            );
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(language: &str) -> LanguageDetector {
        LanguageDetector::new(language).unwrap()
    }

    #[test]
    fn plain_header_matches() {
        assert!(detector("Polish").matches("==Polish=="));
    }

    #[test]
    fn spaced_and_linked_variants_match() {
        let polish = detector("Polish");
        for line in ["== Polish ==", "==[[Polish]]==", "== [[Polish]] =="] {
            assert!(polish.matches(line), "expected a match for {line:?}");
        }
    }

    #[test]
    fn deeper_nesting_is_rejected() {
        let polish = detector("Polish");
        assert!(!polish.matches("===Polish==="));
        assert!(!polish.matches("==Polish==="));
        assert!(!polish.matches("===Polish=="));
    }

    #[test]
    fn combined_header_is_rejected() {
        assert!(!detector("Polish").matches("==Polish and Russian=="));
    }

    #[test]
    fn name_as_suffix_of_another_name_is_rejected() {
        assert!(!detector("Polish").matches("==Old Polish=="));
    }

    #[test]
    fn bare_name_in_prose_is_rejected() {
        let polish = detector("Polish");
        assert!(!polish.matches("the Polish section was moved"));
        assert!(!polish.matches("=Polish="));
    }

    #[test]
    fn trailing_junk_after_header_is_tolerated() {
        let polish = detector("Polish");
        assert!(polish.matches("==Polish==&lt;!-- stray --&gt;"));
        assert!(polish.matches("  ==Polish==  "));
    }

    #[test]
    fn lines_without_the_name_never_reach_the_regex() {
        // the cheap tier alone decides here; the full pattern would also
        // reject, this pins the gate itself
        assert!(!detector("Polish").matches("==Russian=="));
    }

    #[test]
    fn name_is_spliced_verbatim_into_the_pattern() {
        let dotted = detector("P.lish");
        assert!(dotted.matches("==P.lish=="));
        // `.` keeps its regex meaning in the full pattern, but the cheap
        // tier still gates on the literal name
        assert!(!dotted.matches("==Palish=="));
    }

    #[test]
    fn invalid_pattern_is_a_startup_error() {
        assert!(LanguageDetector::new("Greek (").is_err());
    }
}
