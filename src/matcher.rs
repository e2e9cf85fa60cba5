//! Two-phase block location: exact substring search, then a
//! whitespace-tolerant line-structural fallback.
//!
//! A target is a block of whole lines, so both phases anchor at line
//! boundaries: a target never matches in the middle of a line, which is what
//! keeps an applied rule from re-matching inside its own replacement. The
//! fallback compares trimmed line content byte-for-byte, so every character
//! of the target is matched literally; tolerance loosens only indentation,
//! never token content.

use serde::Serialize;
use strsim::normalized_levenshtein;

/// Which phase located the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPhase {
    /// Contiguous case-sensitive substring equal to the newline-joined target.
    Exact,
    /// Contiguous run of lines equal to the target lines modulo leading and
    /// trailing horizontal whitespace on each line.
    Fallback,
}

/// A located target block: a byte span within the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMatch {
    /// Starting byte offset (inclusive).
    pub byte_start: usize,
    /// Ending byte offset (exclusive).
    pub byte_end: usize,
    pub phase: MatchPhase,
}

/// Locate the first occurrence of `target` in `content`.
///
/// Only the first occurrence (in document order) is ever reported; a rule
/// touches exactly one contiguous region, never all occurrences.
pub fn find_block(content: &str, target: &str) -> Option<BlockMatch> {
    if target.is_empty() {
        return None;
    }

    if let Some(byte_start) = find_exact(content, target) {
        return Some(BlockMatch {
            byte_start,
            byte_end: byte_start + target.len(),
            phase: MatchPhase::Exact,
        });
    }

    find_relaxed(content, target)
}

/// Exact phase: first literal occurrence of `target` that sits on line
/// boundaries.
///
/// An occurrence embedded mid-line does not count: patching `B` to `B2` must
/// not find the `B` inside `B2` on the next run. That would break the
/// idempotence contract.
fn find_exact(content: &str, target: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut from = 0;
    while let Some(pos) = content[from..].find(target) {
        let start = from + pos;
        let end = start + target.len();
        let starts_line = start == 0 || bytes[start - 1] == b'\n';
        let ends_line = end == bytes.len()
            || bytes[end] == b'\n'
            || bytes[end] == b'\r'
            || bytes[end - 1] == b'\n';
        if starts_line && ends_line {
            return Some(start);
        }
        from = start + 1;
    }
    None
}

fn trim_horizontal(line: &str) -> &str {
    line.trim_matches(|c| c == ' ' || c == '\t')
}

/// A document line with its byte span. `end` excludes the line terminator,
/// `raw_end` includes it.
struct LineSpan<'a> {
    start: usize,
    end: usize,
    raw_end: usize,
    trimmed: &'a str,
}

fn line_spans(content: &str) -> Vec<LineSpan<'_>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for raw in content.split_inclusive('\n') {
        let body = raw.strip_suffix('\n').unwrap_or(raw);
        let body = body.strip_suffix('\r').unwrap_or(body);
        spans.push(LineSpan {
            start: offset,
            end: offset + body.len(),
            raw_end: offset + raw.len(),
            trimmed: trim_horizontal(body),
        });
        offset += raw.len();
    }
    spans
}

/// Fallback phase: scan for a contiguous run of lines whose trimmed content
/// equals the trimmed target lines, in order. The matched span covers the
/// full lines, indentation included. A target ending in a newline claims the
/// final line's newline too, mirroring what the exact phase would have
/// consumed for the same target.
fn find_relaxed(content: &str, target: &str) -> Option<BlockMatch> {
    let wanted: Vec<&str> = target.lines().map(trim_horizontal).collect();
    if wanted.is_empty() {
        return None;
    }

    let lines = line_spans(content);
    if lines.len() < wanted.len() {
        return None;
    }

    for start in 0..=lines.len() - wanted.len() {
        let window = &lines[start..start + wanted.len()];
        if window
            .iter()
            .zip(&wanted)
            .all(|(line, want)| line.trimmed == *want)
        {
            let last = &window[wanted.len() - 1];
            let byte_end = if target.ends_with('\n') {
                last.raw_end
            } else {
                last.end
            };
            return Some(BlockMatch {
                byte_start: window[0].start,
                byte_end,
                phase: MatchPhase::Fallback,
            });
        }
    }

    None
}

/// The closest non-matching candidate region for a target block.
///
/// Diagnostic only, never used to decide a patch. Surfaced by the CLI when
/// a rule yields no match, so a stale target block can be repaired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NearMiss {
    /// 1-based line number where the candidate region starts.
    pub line: usize,
    /// Normalized Levenshtein similarity over trimmed content, in [0, 1].
    pub similarity: f64,
}

/// Find the window of equal line count most similar to the target.
pub fn closest_candidate(content: &str, target: &str) -> Option<NearMiss> {
    let wanted: Vec<&str> = target.lines().map(trim_horizontal).collect();
    if wanted.is_empty() {
        return None;
    }
    let wanted_joined = wanted.join("\n");

    let trimmed: Vec<&str> = content
        .lines()
        .map(trim_horizontal)
        .collect();
    if trimmed.len() < wanted.len() {
        return None;
    }

    let mut best: Option<NearMiss> = None;
    for start in 0..=trimmed.len() - wanted.len() {
        let window = trimmed[start..start + wanted.len()].join("\n");
        let similarity = normalized_levenshtein(&wanted_joined, &window);
        if best.map_or(true, |b| similarity > b.similarity) {
            best = Some(NearMiss {
                line: start + 1,
                similarity,
            });
        }
    }
    best
}
