use crate::error::{Error, Result};
use crate::grammar::Span;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectedText {
    pub text: String,
    pub applied: usize,
    /// Offsets of spans dropped because they overlap an applied correction.
    pub skipped_overlaps: Vec<usize>,
}

/// Replace every span's covered text with its first suggestion.
///
/// Spans are applied right to left so earlier offsets stay valid. When two
/// spans overlap, the one with the higher offset wins and the other is
/// skipped with a warning. An empty span or one reaching past the end of
/// `text` is rejected before anything is replaced.
pub fn assemble(text: &str, spans: &[Span]) -> Result<CorrectedText> {
    if spans.is_empty() {
        return Ok(CorrectedText {
            text: text.to_string(),
            applied: 0,
            skipped_overlaps: Vec::new(),
        });
    }

    // Byte position of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    for span in spans {
        if span.length == 0 || span.end() > char_len {
            return Err(Error::ContractViolation {
                offset: span.offset,
                length: span.length,
                text_len: char_len,
            });
        }
    }

    let mut order: Vec<&Span> = spans.iter().collect();
    // Stable sort: among equal offsets the first reported span is applied.
    order.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut corrected = text.to_string();
    let mut floor = usize::MAX;
    let mut applied = 0;
    let mut skipped_overlaps = Vec::new();

    for span in order {
        let Some(replacement) = span.suggestions.first() else {
            continue;
        };

        if span.end() > floor {
            tracing::warn!(
                offset = span.offset,
                length = span.length,
                rule = %span.rule_id,
                "skipping correction that overlaps an applied one"
            );
            skipped_overlaps.push(span.offset);
            continue;
        }

        let start = boundaries[span.offset];
        let end = boundaries[span.end()];
        corrected.replace_range(start..end, replacement);
        floor = span.offset;
        applied += 1;
    }

    Ok(CorrectedText {
        text: corrected,
        applied,
        skipped_overlaps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Category;

    #[test]
    fn test_empty_span_list_is_identity() {
        for text in ["", "Hallo Welt", "Größe und Maß"] {
            let result = assemble(text, &[]).unwrap();
            assert_eq!(result.text, text);
            assert_eq!(result.applied, 0);
        }
    }

    #[test]
    fn test_article_and_verb_scenario() {
        let spans = vec![
            Span::new(9, 5, Category::Grammar, &["geht"]),
            Span::new(18, 3, Category::Other("CASE".to_string()), &["dem"]),
        ];
        let result = assemble("Der Mann gehen zu der Haus.", &spans).unwrap();
        assert_eq!(result.text, "Der Mann geht zu dem Haus.");
        assert_eq!(result.applied, 2);
    }

    #[test]
    fn test_empty_suggestion_removes_exactly_the_span() {
        let text = "Ich habe habe das das Buch.";
        let spans = vec![
            Span::new(4, 5, Category::Redundancy, &[""]),
            Span::new(14, 4, Category::Redundancy, &[""]),
        ];
        let result = assemble(text, &spans).unwrap();
        assert_eq!(result.text, "Ich habe das Buch.");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let text = "eins zwei drei";
        let a = Span::new(0, 4, Category::Typos, &["EINS"]);
        let b = Span::new(10, 4, Category::Typos, &["DREI"]);
        let forward = assemble(text, &[a.clone(), b.clone()]).unwrap();
        let backward = assemble(text, &[b, a]).unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.text, "EINS zwei DREI");
    }

    #[test]
    fn test_spans_without_suggestions_are_left_alone() {
        let spans = vec![Span::new(0, 3, Category::Typos, &[])];
        let result = assemble("Teh Haus", &spans).unwrap();
        assert_eq!(result.text, "Teh Haus");
        assert_eq!(result.applied, 0);
    }

    #[test]
    fn test_overlapping_span_is_skipped() {
        // "zu der" and "der Haus" overlap on "der".
        let text = "Er geht zu der Haus.";
        let spans = vec![
            Span::new(8, 6, Category::Grammar, &["zum"]),
            Span::new(11, 8, Category::Grammar, &["dem Haus"]),
        ];
        let result = assemble(text, &spans).unwrap();
        assert_eq!(result.text, "Er geht zu dem Haus.");
        assert_eq!(result.applied, 1);
        assert_eq!(result.skipped_overlaps, vec![8]);
    }

    #[test]
    fn test_out_of_bounds_span_fails_fast() {
        let spans = vec![
            Span::new(0, 3, Category::Typos, &["Das"]),
            Span::new(6, 10, Category::Typos, &["x"]),
        ];
        let err = assemble("Dsa ist", &spans).unwrap_err();
        assert!(matches!(
            err,
            Error::ContractViolation {
                offset: 6,
                length: 10,
                text_len: 7
            }
        ));
    }

    #[test]
    fn test_empty_span_is_rejected() {
        let insertion = Span::new(9, 0, Category::Grammar, &["nach "]);
        let replacement = Span::new(9, 4, Category::Grammar, &["Hause"]);
        for spans in [
            vec![insertion.clone(), replacement.clone()],
            vec![replacement, insertion],
        ] {
            let err = assemble("Ich gehe Haus", &spans).unwrap_err();
            assert!(matches!(
                err,
                Error::ContractViolation {
                    offset: 9,
                    length: 0,
                    text_len: 13
                }
            ));
        }
    }

    #[test]
    fn test_offsets_count_characters_not_bytes() {
        let text = "Die Grösse der Straße";
        let spans = vec![
            Span::new(4, 6, Category::Typos, &["Größe"]),
            Span::new(15, 6, Category::Typos, &["Strasse"]),
        ];
        let result = assemble(text, &spans).unwrap();
        assert_eq!(result.text, "Die Größe der Strasse");
    }
}
