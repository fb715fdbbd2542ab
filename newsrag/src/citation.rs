//! Citation annotation for generated responses.
//!
//! A text-generation service returns its response together with citation
//! spans: half-open `[start, end)` character ranges, each attributed to one or
//! more source document ids. This module renders those spans as compact
//! bracketed labels, either as a segment list for rich display
//! ([`annotate`]) or as bolded inline markdown ([`annotate_inline`]).
//!
//! Offsets are counted in characters (Unicode scalar values), not bytes.
//!
//! ```rust,ignore
//! use newsrag::{Citation, DataSource, annotate_inline};
//!
//! let citations = [Citation::new(2, 5, ["doc_001X"])];
//! let out = annotate_inline("ABCDEFGHIJ", &citations, DataSource::StaticNews)?;
//! assert_eq!(out, "AB**CDE[001X]**FGHIJ");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::Provenance;
use crate::error::{RagError, Result};

/// Highlight color attached to cited segments.
pub const HIGHLIGHT_COLOR: &str = "#eeeeee";

/// Labels shown before a citation's label list is truncated.
const MAX_LABELS: usize = 3;

/// Where the cited documents came from; selects the id prefix to strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// Pre-scraped news articles indexed in the session.
    #[default]
    StaticNews,
    /// Pages of locally uploaded files.
    LocalFile,
    /// Results of the generator's own web-search connector.
    WebSearch,
}

impl DataSource {
    /// Number of leading characters of a document id that carry no
    /// information for the reader.
    ///
    /// Session-local ids look like `doc_0`; web-search ids carry a longer
    /// connector namespace.
    pub fn id_prefix_len(self) -> usize {
        match self {
            Self::StaticNews | Self::LocalFile => 4,
            Self::WebSearch => 11,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::StaticNews => "static-news",
            Self::LocalFile => "local-file",
            Self::WebSearch => "web-search",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "static-news" => Ok(Self::StaticNews),
            "local-file" => Ok(Self::LocalFile),
            "web-search" => Ok(Self::WebSearch),
            other => Err(RagError::ConfigError(format!(
                "unknown data source '{other}', expected static-news, local-file or web-search"
            ))),
        }
    }
}

/// A span of generated text attributed to source documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// First cited character (inclusive).
    pub start: usize,
    /// End of the cited range (exclusive).
    pub end: usize,
    /// Ids of the documents supporting the span, in generator order.
    pub document_ids: Vec<String>,
}

impl Citation {
    /// Create a citation over `[start, end)`.
    pub fn new<I, S>(start: usize, end: usize, document_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { start, end, document_ids: document_ids.into_iter().map(Into::into).collect() }
    }

    /// The bracketed label for this citation, e.g. `[001, 002]`.
    pub fn label(&self, source: DataSource) -> String {
        label(&self.document_ids, source)
    }
}

/// A document the generator reports as cited, as delivered alongside the
/// response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitedDocument {
    /// Generator-assigned document id.
    pub id: String,
    /// Where the document came from.
    #[serde(flatten)]
    pub provenance: Provenance,
}

/// One piece of an annotated response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// Text outside any citation.
    Plain {
        /// The uncited text.
        text: String,
    },
    /// A cited span with its source label.
    Cited {
        /// The cited text.
        text: String,
        /// Bracketed source label.
        label: String,
        /// Highlight color, always [`HIGHLIGHT_COLOR`].
        color: String,
    },
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self::Plain { text: text.to_string() }
    }

    /// The segment's text without its label.
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Cited { text, .. } => text,
        }
    }
}

/// Strip `prefix` characters from `id`; ids no longer than the prefix
/// become empty.
fn strip_prefix(id: &str, prefix: usize) -> &str {
    id.char_indices().nth(prefix).map(|(i, _)| &id[i..]).unwrap_or("")
}

/// Render the bracketed label for a list of document ids.
///
/// Repeated ids are shown once. More than three ids show the first three
/// followed by `...`: `[a, b, c...]`.
pub fn label(document_ids: &[String], source: DataSource) -> String {
    let prefix = source.id_prefix_len();
    let mut labels: Vec<&str> = Vec::with_capacity(document_ids.len());
    for id in document_ids {
        let stripped = strip_prefix(id, prefix);
        if !labels.contains(&stripped) {
            labels.push(stripped);
        }
    }

    if labels.len() > MAX_LABELS {
        format!("[{}...]", labels[..MAX_LABELS].join(", "))
    } else {
        format!("[{}]", labels.join(", "))
    }
}

/// Check citation order and bounds; returns the byte offset of every
/// character boundary in `text` (one more entry than characters).
fn validate(text: &str, citations: &[Citation]) -> Result<Vec<usize>> {
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_len = boundaries.len() - 1;

    let mut previous_end = 0;
    for (n, citation) in citations.iter().enumerate() {
        if citation.start > citation.end {
            return Err(RagError::CitationError(format!(
                "citation {n} starts at {} after its end {}",
                citation.start, citation.end
            )));
        }
        if citation.end > char_len {
            return Err(RagError::CitationError(format!(
                "citation {n} ends at {} beyond the text length {char_len}",
                citation.end
            )));
        }
        if citation.start < previous_end {
            return Err(RagError::CitationError(format!(
                "citation {n} starts at {} before the previous citation ends at {previous_end}",
                citation.start
            )));
        }
        previous_end = citation.end;
    }
    Ok(boundaries)
}

/// Split `text` into plain and cited segments.
///
/// Emits, for each citation, the plain text since the previous citation and
/// then the cited span with its label. The trailing plain segment is always
/// emitted, even when empty.
///
/// # Errors
///
/// Returns [`RagError::CitationError`] if a citation is inverted, runs past
/// the end of `text`, or overlaps or precedes the citation before it.
pub fn annotate(text: &str, citations: &[Citation], source: DataSource) -> Result<Vec<Segment>> {
    let boundaries = validate(text, citations)?;

    let mut segments = Vec::with_capacity(citations.len() * 2 + 1);
    let mut last_end = 0;
    for citation in citations {
        let start = boundaries[citation.start];
        let end = boundaries[citation.end];
        segments.push(Segment::plain(&text[last_end..start]));
        segments.push(Segment::Cited {
            text: text[start..end].to_string(),
            label: citation.label(source),
            color: HIGHLIGHT_COLOR.to_string(),
        });
        last_end = end;
    }
    segments.push(Segment::plain(&text[last_end..]));
    Ok(segments)
}

/// Rewrite `text` with each cited span bolded and followed by its label:
/// `**{cited}{label}**`.
///
/// Citation offsets refer to the original text; each insertion shifts the
/// later citations by the number of characters it added.
///
/// # Errors
///
/// Same as [`annotate`].
pub fn annotate_inline(text: &str, citations: &[Citation], source: DataSource) -> Result<String> {
    validate(text, citations)?;

    let (annotated, _) =
        citations.iter().fold((text.to_string(), 0usize), |(output, shift), citation| {
            let label = citation.label(source);
            let mut chars = output.chars();
            let before: String = chars.by_ref().take(citation.start + shift).collect();
            let cited: String = chars.by_ref().take(citation.end - citation.start).collect();
            let after: String = chars.collect();

            // "**" on both sides plus the label
            let inserted = 4 + label.chars().count();
            (format!("{before}**{cited}{label}**{after}"), shift + inserted)
        });
    Ok(annotated)
}

/// Render the "relevant articles" listing for the cited documents, sorted
/// by id.
///
/// Pages render as `[label] file: [page]`, articles as
/// `[label] [title](url)`.
pub fn reference_list(cited_documents: &[CitedDocument], source: DataSource) -> Vec<String> {
    let mut sorted: Vec<&CitedDocument> = cited_documents.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
        .into_iter()
        .map(|doc| {
            let stripped = strip_prefix(&doc.id, source.id_prefix_len());
            format!("[{stripped}] {}", doc.provenance)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_by_source() {
        assert_eq!(strip_prefix("doc_12", DataSource::StaticNews.id_prefix_len()), "12");
        assert_eq!(strip_prefix("web-search_7", DataSource::WebSearch.id_prefix_len()), "7");
        assert_eq!(strip_prefix("abc", 4), "");
        assert_eq!(strip_prefix("dóc_é1", 4), "é1");
    }

    #[test]
    fn label_dedups_repeated_ids() {
        let ids = vec!["doc_1".to_string(), "doc_1".to_string(), "doc_2".to_string()];
        assert_eq!(label(&ids, DataSource::LocalFile), "[1, 2]");
    }

    #[test]
    fn label_of_no_ids_is_empty_brackets() {
        assert_eq!(label(&[], DataSource::StaticNews), "[]");
    }

    #[test]
    fn trailing_segment_is_always_emitted() {
        let segments =
            annotate("cited", &[Citation::new(0, 5, ["doc_0"])], DataSource::StaticNews).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::plain(""));
        assert_eq!(segments[2], Segment::plain(""));
    }

    #[test]
    fn offsets_count_characters() {
        let text = "héllo wörld";
        let segments =
            annotate(text, &[Citation::new(6, 11, ["doc_9"])], DataSource::StaticNews).unwrap();
        assert_eq!(segments[1].text(), "wörld");
        let inline =
            annotate_inline(text, &[Citation::new(0, 5, ["doc_9"])], DataSource::StaticNews)
                .unwrap();
        assert_eq!(inline, "**héllo[9]** wörld");
    }

    #[test]
    fn rejects_malformed_citations() {
        let source = DataSource::StaticNews;
        let inverted = [Citation::new(4, 2, ["doc_1"])];
        let too_long = [Citation::new(0, 11, ["doc_1"])];
        let overlapping = [Citation::new(0, 5, ["doc_1"]), Citation::new(3, 7, ["doc_2"])];
        for citations in [&inverted[..], &too_long[..], &overlapping[..]] {
            let err = annotate("0123456789", citations, source).unwrap_err();
            assert_eq!(err.kind(), "citation");
            assert!(annotate_inline("0123456789", citations, source).is_err());
        }
    }

    #[test]
    fn adjacent_and_empty_citations_are_valid() {
        let citations = [
            Citation::new(0, 2, ["doc_a"]),
            Citation::new(2, 2, ["doc_b"]),
            Citation::new(2, 4, ["doc_c"]),
        ];
        let out = annotate_inline("wxyz", &citations, DataSource::StaticNews).unwrap();
        assert_eq!(out, "**wx[a]****[b]****yz[c]**");
    }

    #[test]
    fn data_source_parses_cli_names() {
        assert_eq!("web-search".parse::<DataSource>().unwrap(), DataSource::WebSearch);
        assert_eq!(DataSource::LocalFile.to_string(), "local-file");
        assert!("Web Search".parse::<DataSource>().is_err());
        let json = serde_json::to_string(&DataSource::StaticNews).unwrap();
        assert_eq!(json, "\"static-news\"");
    }

    #[test]
    fn cited_document_flattens_provenance() {
        let json = r#"{"id": "doc_3", "title": "T", "url": "https://x", "text": "body"}"#;
        let doc: CitedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(
            doc.provenance,
            Provenance::Article { title: "T".into(), url: "https://x".into() }
        );
    }

    #[test]
    fn segments_serialize_with_kind_tag() {
        let json = serde_json::to_value(Segment::plain("x")).unwrap();
        assert_eq!(json["kind"], "plain");
        assert_eq!(json["text"], "x");
    }
}
