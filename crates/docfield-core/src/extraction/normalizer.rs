//! Whitespace and line-ending canonicalization of recognized text.

use crate::models::config::NormalizerConfig;

/// Canonicalizes recognizer output. Both operations are idempotent.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    config: NormalizerConfig,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Collapse every whitespace run to one space, or to one `\n` when the
    /// run contains a line break and line breaks are preserved, then trim.
    pub fn normalize(&self, text: &str) -> String {
        let text = canonical_line_endings(text);
        let mut out = String::with_capacity(text.len());
        let mut pending: Option<char> = None;

        for c in text.chars() {
            if c.is_whitespace() {
                let separator = if c == '\n' && self.config.preserve_line_breaks {
                    '\n'
                } else {
                    ' '
                };
                pending = match pending {
                    Some('\n') => Some('\n'),
                    _ => Some(separator),
                };
                continue;
            }

            if let Some(separator) = pending.take() {
                if !out.is_empty() {
                    out.push(separator);
                }
            }
            out.push(c);
        }

        out
    }

    /// Keep the column layout: canonical line endings, no trailing
    /// whitespace, no leading or trailing blank lines. Interior spacing and
    /// blank lines between blocks are kept.
    pub fn canonicalize_layout(&self, text: &str) -> String {
        let text = canonical_line_endings(text);
        let lines: Vec<&str> = text.lines().map(str::trim_end).collect();

        let first = lines.iter().position(|l| !l.is_empty());
        let last = lines.iter().rposition(|l| !l.is_empty());
        match (first, last) {
            (Some(first), Some(last)) => lines[first..=last].join("\n"),
            _ => String::new(),
        }
    }
}

fn canonical_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_collapses_runs() {
        let normalizer = TextNormalizer::default();
        assert_eq!(
            normalizer.normalize("  Référence:\t PROD-1 \r\n\r\n  Quantité :  5  "),
            "Référence: PROD-1\nQuantité : 5"
        );
    }

    #[test]
    fn test_normalize_without_line_breaks() {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            preserve_line_breaks: false,
        });
        assert_eq!(normalizer.normalize("a\n\nb \t c\r"), "a b c");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = TextNormalizer::default();
        let samples = [
            "",
            "   ",
            "\r\n a \u{00a0} b\n\n\tc  \r",
            "Total TTC :\t\t 1 234,50 €\r\nTVA 20 %\n\n\n",
            "ligne 1 \n ligne 2",
        ];
        for sample in samples {
            let once = normalizer.normalize(sample);
            assert_eq!(normalizer.normalize(&once), once, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_canonicalize_layout_keeps_columns() {
        let normalizer = TextNormalizer::default();
        let text = "\r\n\r\nDésignation   Qté   Prix  \r\nVis M4      10    0,50\r\n\r\nTotal  5,00  \r\n\n";
        assert_eq!(
            normalizer.canonicalize_layout(text),
            "Désignation   Qté   Prix\nVis M4      10    0,50\n\nTotal  5,00"
        );
    }

    #[test]
    fn test_canonicalize_layout_is_idempotent() {
        let normalizer = TextNormalizer::default();
        let once = normalizer.canonicalize_layout("\n a  b \r\n\r\n c\t\n");
        assert_eq!(normalizer.canonicalize_layout(&once), once);
        assert_eq!(normalizer.canonicalize_layout(" \n\t\n"), "");
    }
}
