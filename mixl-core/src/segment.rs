//! Segmenter
//!
//! Splits a `.mixl` source into ordered, language-tagged segments.
//! Tag validation runs over the whole file first so that every unknown tag
//! is reported at once.

use crate::error::{EngineError, StructureError, StructureErrorKind, ValidationError};
use mixl_config::{EngineConfig, GuestLanguage};
use std::fmt;
use tracing::{debug, warn};

const TARGET: &str = "mixl::segment";

/// A contiguous run of same-language source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub language: GuestLanguage,
    /// Tag as written in the source (without brackets)
    pub tag: String,
    /// Body lines joined by `\n`
    pub source: String,
    /// Position among produced segments
    pub ordinal: usize,
    /// 1-based file line of the first body line
    pub first_line: usize,
}

impl Segment {
    /// Body lines paired with their 1-based file line numbers
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.source
            .split('\n')
            .enumerate()
            .map(move |(idx, line)| (self.first_line + idx, line))
    }
}

/// Non-fatal segmentation findings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentWarning {
    /// Tag immediately followed by another tag, or a whitespace-only body
    EmptySegment { tag: String, line: usize },
    /// Tag at the end of the file with no body
    TrailingSegment { tag: String, line: usize },
}

impl fmt::Display for SegmentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentWarning::EmptySegment { tag, line } => {
                write!(f, "line {}: [{}] segment is empty and was skipped", line, tag)
            }
            SegmentWarning::TrailingSegment { tag, line } => {
                write!(f, "line {}: trailing [{}] tag has no code", line, tag)
            }
        }
    }
}

/// Segmenter output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub warnings: Vec<SegmentWarning>,
}

/// Extract the identifier of a tag line (`[js]`, surrounding whitespace ignored)
pub fn parse_tag(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix('[')?.strip_suffix(']')?;
    if !inner.is_empty() && inner.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some(inner)
    } else {
        None
    }
}

/// Splits sources into segments against a configured set of tags
pub struct Segmenter<'a> {
    config: &'a EngineConfig,
}

struct OpenSegment<'s> {
    tag: &'s str,
    language: GuestLanguage,
    tag_line: usize,
    body: Vec<&'s str>,
}

impl<'a> Segmenter<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Check every tag line against the configured languages
    pub fn validate(&self, source: &str) -> Result<(), EngineError> {
        let errors: Vec<ValidationError> = source
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| parse_tag(line).map(|tag| (idx + 1, tag)))
            .filter(|(_, tag)| self.config.language_for_tag(tag).is_none())
            .map(|(line, tag)| ValidationError {
                tag: tag.to_string(),
                line,
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(errors))
        }
    }

    /// Validate, then split into segments in source order
    pub fn split(&self, source: &str) -> Result<Segmentation, EngineError> {
        self.validate(source)?;

        let mut out = Segmentation::default();
        let mut open: Option<OpenSegment<'_>> = None;

        for (idx, line) in source.lines().enumerate() {
            let line_no = idx + 1;
            if let Some(tag) = parse_tag(line) {
                if let Some(done) = open.take() {
                    self.close(done, false, &mut out);
                }
                // validate() already rejected unknown tags
                if let Some(spec) = self.config.language_for_tag(tag) {
                    open = Some(OpenSegment {
                        tag,
                        language: spec.language,
                        tag_line: line_no,
                        body: Vec::new(),
                    });
                }
                continue;
            }

            match open.as_mut() {
                Some(segment) => segment.body.push(line),
                None if line.trim().is_empty() => {}
                None => {
                    return Err(StructureError::new(
                        StructureErrorKind::CodeOutsideSegment,
                        line_no,
                    )
                    .into())
                }
            }
        }

        if let Some(done) = open.take() {
            self.close(done, true, &mut out);
        }

        debug!(
            target: TARGET,
            segments = out.segments.len(),
            warnings = out.warnings.len(),
            "segmentation complete"
        );
        Ok(out)
    }

    fn close(&self, segment: OpenSegment<'_>, at_end: bool, out: &mut Segmentation) {
        let tag = segment.tag.to_string();
        let line = segment.tag_line;

        if segment.body.iter().all(|l| l.trim().is_empty()) {
            let warning = if at_end && segment.body.is_empty() {
                SegmentWarning::TrailingSegment { tag, line }
            } else {
                SegmentWarning::EmptySegment { tag, line }
            };
            warn!(target: TARGET, "{}", warning);
            out.warnings.push(warning);
            return;
        }

        let ordinal = out.segments.len();
        debug!(
            target: TARGET,
            ordinal,
            tag = %tag,
            language = %segment.language,
            lines = segment.body.len(),
            "segment"
        );
        out.segments.push(Segment {
            language: segment.language,
            tag,
            source: segment.body.join("\n"),
            ordinal,
            first_line: line + 1,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(source: &str) -> Result<Segmentation, EngineError> {
        let config = EngineConfig::default();
        Segmenter::new(&config).split(source)
    }

    // ===== tags =====

    #[test]
    fn test_parse_tag() {
        assert_eq!(parse_tag("[js]"), Some("js"));
        assert_eq!(parse_tag("  [PY]  "), Some("PY"));
        assert_eq!(parse_tag("[]"), None);
        assert_eq!(parse_tag("[a b]"), None);
        assert_eq!(parse_tag("x = [1]"), None);
        assert_eq!(parse_tag("[1, 2]"), None);
    }

    #[test]
    fn test_unknown_tags_are_aggregated() {
        let err = split("[ruby]\nputs 1\n[js]\nlet a = 1\n[go]\nx := 1").unwrap_err();
        match err {
            EngineError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].tag, "ruby");
                assert_eq!(errors[0].line, 1);
                assert_eq!(errors[1].tag, "go");
                assert_eq!(errors[1].line, 5);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_tags_match_case_insensitively() {
        let out = split("[JS]\nlet a = 1\n[Py]\nprint(a)").unwrap();
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.segments[0].language, GuestLanguage::JavaScript);
        assert_eq!(out.segments[0].tag, "JS");
        assert_eq!(out.segments[1].language, GuestLanguage::Python);
    }

    // ===== segments =====

    #[test]
    fn test_segments_keep_source_order_and_lines() {
        let out = split("[js]\nlet a = 1\nlet b = 2\n[py]\nprint(a)\n[js]\nconsole.log(b)").unwrap();
        let ordinals: Vec<usize> = out.segments.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(out.segments[0].source, "let a = 1\nlet b = 2");
        assert_eq!(out.segments[0].first_line, 2);
        assert_eq!(out.segments[1].first_line, 5);
        let numbered: Vec<(usize, &str)> = out.segments[0].numbered_lines().collect();
        assert_eq!(numbered, vec![(2, "let a = 1"), (3, "let b = 2")]);
    }

    #[test]
    fn test_body_is_verbatim() {
        let body = "def f(x):\n    return x\n\nprint(f(1))";
        let out = split(&format!("[py]\n{}", body)).unwrap();
        assert_eq!(out.segments[0].source, body);
    }

    #[test]
    fn test_crlf_is_tolerated() {
        let out = split("[js]\r\nlet a = 1\r\n[py]\r\nprint(a)\r\n").unwrap();
        assert_eq!(out.segments[0].source, "let a = 1");
        assert_eq!(out.segments[1].source, "print(a)");
    }

    #[test]
    fn test_code_before_first_tag_is_structure_error() {
        let err = split("\n\nlet a = 1\n[js]\nlet b = 2").unwrap_err();
        match err {
            EngineError::Structure(e) => {
                assert_eq!(e.kind, StructureErrorKind::CodeOutsideSegment);
                assert_eq!(e.line, 3);
            }
            other => panic!("expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_before_first_tag_are_ignored() {
        let out = split("\n   \n[py]\nx = 1").unwrap();
        assert_eq!(out.segments.len(), 1);
    }

    // ===== warnings =====

    #[test]
    fn test_empty_and_trailing_segments_warn() {
        let out = split("[js]\n[py]\n   \n[js]\nlet a = 1\n[py]").unwrap();
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].ordinal, 0);
        assert_eq!(
            out.warnings,
            vec![
                SegmentWarning::EmptySegment {
                    tag: "js".to_string(),
                    line: 1
                },
                SegmentWarning::EmptySegment {
                    tag: "py".to_string(),
                    line: 2
                },
                SegmentWarning::TrailingSegment {
                    tag: "py".to_string(),
                    line: 6
                },
            ]
        );
    }

    #[test]
    fn test_empty_source() {
        let out = split("").unwrap();
        assert!(out.segments.is_empty());
        assert!(out.warnings.is_empty());
    }
}
