//! Subject-line normalization.
//!
//! Report emails are routed by their subject: `<folder path> - <report name>`.
//! The folder path may use `/` or `\` between segments. Reply and forward
//! prefixes are ignored, so `"Fwd: Reports/Sales - Weekly"` files the same way
//! as the original message.
//!
//! Every component is reduced to lowercase alphanumeric words joined by `-`:
//!
//! | Subject                                        | Structure            | Report        |
//! |------------------------------------------------|----------------------|---------------|
//! | `Reports/Sales - Weekly`                       | `reports/sales`      | `weekly`      |
//! | `Fwd: RE: Finance / Q3 Results - Monthly P&L`  | `finance/q3-results` | `monthly-pl`  |
//! | `Ops\EU - Daily - Uptime`                      | `ops/eu-daily`       | `uptime`      |
//!
//! Pure string parsing, no I/O.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::ParseError;

/// Leading `Re:` / `Fwd:` style prefix, with an optional `[n]` counter.
static REPLY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(re|fwd?|aw|wg)\s*(\[\d+\])?\s*:\s*").expect("reply prefix regex")
});

/// Folder/report separator: a dash surrounded by whitespace.
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-\u{2013}\u{2014}]\s+").expect("separator regex"));

/// Folder path and report name derived from a subject line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedSubject {
    /// Folder name to file the report under, e.g. `reports/sales`.
    pub normalized_structure: String,
    /// File base name for uploaded attachments, e.g. `weekly`.
    pub normalized_report_name: String,
}

/// Parse a raw subject line into its folder path and report name.
pub fn parse_subject_line(raw: &str) -> Result<NormalizedSubject, ParseError> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let subject = strip_reply_prefixes(&collapsed);
    if subject.is_empty() {
        return Err(ParseError::EmptySubject);
    }

    let Some(sep) = SEPARATOR.find_iter(subject).last() else {
        return Err(ParseError::MissingSeparator {
            subject: subject.to_string(),
        });
    };
    let (structure, report) = (&subject[..sep.start()], &subject[sep.end()..]);

    let segments: Vec<String> = structure
        .split(['/', '\\'])
        .map(normalize_component)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return Err(ParseError::EmptyStructure {
            subject: subject.to_string(),
        });
    }

    let report_name = normalize_component(report);
    if report_name.is_empty() {
        return Err(ParseError::EmptyReportName {
            subject: subject.to_string(),
        });
    }

    Ok(NormalizedSubject {
        normalized_structure: segments.join("/"),
        normalized_report_name: report_name,
    })
}

fn strip_reply_prefixes(subject: &str) -> &str {
    let mut rest = subject.trim();
    while let Some(m) = REPLY_PREFIX.find(rest) {
        rest = rest[m.end()..].trim_start();
    }
    rest
}

/// Lowercase, keep alphanumerics, turn word separators into single dashes.
fn normalize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;

    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else if ch.is_whitespace() || matches!(ch, '-' | '_' | '.') {
            pending_dash = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(subject: &str) -> (String, String) {
        let n = parse_subject_line(subject).unwrap();
        (n.normalized_structure, n.normalized_report_name)
    }

    // ── Documented examples ─────────────────────────────────────

    #[test]
    fn simple_path_and_report() {
        assert_eq!(
            parsed("Reports/Sales - Weekly"),
            ("reports/sales".into(), "weekly".into())
        );
    }

    #[test]
    fn reply_prefixes_and_symbols() {
        assert_eq!(
            parsed("Fwd: RE: Finance / Q3 Results - Monthly P&L"),
            ("finance/q3-results".into(), "monthly-pl".into())
        );
    }

    #[test]
    fn last_separator_wins_and_backslash_splits() {
        assert_eq!(
            parsed(r"Ops\EU - Daily - Uptime"),
            ("ops/eu-daily".into(), "uptime".into())
        );
    }

    // ── Normalization details ───────────────────────────────────

    #[test]
    fn extra_whitespace_and_casing_are_normalized() {
        assert_eq!(
            parsed("   REPORTS /   sales\t-   WEEKLY  "),
            ("reports/sales".into(), "weekly".into())
        );
    }

    #[test]
    fn en_and_em_dash_separators() {
        assert_eq!(parsed("Reports \u{2013} Weekly").1, "weekly");
        assert_eq!(parsed("Reports \u{2014} Weekly").1, "weekly");
    }

    #[test]
    fn hyphen_inside_word_is_not_a_separator() {
        assert_eq!(
            parsed("Year-End/Close - Q4-Summary"),
            ("year-end/close".into(), "q4-summary".into())
        );
    }

    #[test]
    fn empty_segments_are_dropped() {
        assert_eq!(parsed("/Reports//Sales/ - Weekly").0, "reports/sales");
    }

    #[test]
    fn dots_and_underscores_become_dashes() {
        assert_eq!(
            parsed("Data_Lake/v2.1 - export.final"),
            ("data-lake/v2-1".into(), "export-final".into())
        );
    }

    #[test]
    fn unicode_letters_are_kept() {
        assert_eq!(
            parsed("Ventes/Été - Résumé"),
            ("ventes/été".into(), "résumé".into())
        );
    }

    #[test]
    fn numbered_reply_prefix() {
        assert_eq!(parsed("Re[2]: Reports - Weekly").0, "reports");
    }

    #[test]
    fn prefix_like_word_is_not_stripped() {
        assert_eq!(parsed("Revenue - Weekly").0, "revenue");
    }

    #[test]
    fn parsing_is_deterministic() {
        let subject = "Fwd: Finance / Q3 Results - Monthly P&L";
        let first = parse_subject_line(subject).unwrap();
        for _ in 0..10 {
            assert_eq!(parse_subject_line(subject).unwrap(), first);
        }
    }

    // ── Failure cases ───────────────────────────────────────────

    #[test]
    fn empty_subject() {
        assert_eq!(parse_subject_line(""), Err(ParseError::EmptySubject));
        assert_eq!(parse_subject_line("   \t "), Err(ParseError::EmptySubject));
        assert_eq!(parse_subject_line("Re: "), Err(ParseError::EmptySubject));
    }

    #[test]
    fn missing_separator() {
        assert!(matches!(
            parse_subject_line("Weekly"),
            Err(ParseError::MissingSeparator { .. })
        ));
        assert!(matches!(
            parse_subject_line("Reports-Weekly"),
            Err(ParseError::MissingSeparator { .. })
        ));
    }

    #[test]
    fn structure_without_words() {
        assert!(matches!(
            parse_subject_line("/ !! / - Weekly"),
            Err(ParseError::EmptyStructure { .. })
        ));
    }

    #[test]
    fn report_without_words() {
        assert!(matches!(
            parse_subject_line("Reports - ???"),
            Err(ParseError::EmptyReportName { .. })
        ));
    }
}
