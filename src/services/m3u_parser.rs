use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::models::{EpisodeNumber, MediaKind, PlaylistEntry};

/// Declaration sentinel, matched case-insensitively
const DECLARATION_PREFIX: &str = "#EXTINF";

lazy_static! {
    /// Regex to normalize whitespace runs into a single space
    static ref MULTI_SPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
    /// Season/episode marker (S01E02, s1e2)
    static ref EPISODE_MARKER: Regex = Regex::new(r"(?i)S(\d{1,2})E(\d{1,2})").unwrap();
}

/// Parsed EXTINF line data
#[derive(Debug, Default)]
struct ExtinfData {
    duration: Option<i32>,
    /// Keys are lowercased
    attributes: HashMap<String, String>,
    /// Text after the first unquoted comma
    title: Option<String>,
}

impl ExtinfData {
    fn attr(&self, key: &str) -> &str {
        self.attributes.get(key).map(|s| s.as_str()).unwrap_or("")
    }
}

fn is_declaration(line: &str) -> bool {
    line.get(..DECLARATION_PREFIX.len())
        .map(|p| p.eq_ignore_ascii_case(DECLARATION_PREFIX))
        .unwrap_or(false)
}

/// Parse an EXTINF line
/// Format: #EXTINF:duration tvg-id="..." tvg-name=... group-title="...",Title
///
/// Attribute values may be double-quoted, single-quoted or bare (a bare value
/// ends at whitespace or a comma). Commas inside quotes do not start the title.
fn parse_extinf(line: &str) -> Option<ExtinfData> {
    if !is_declaration(line) {
        return None;
    }

    let content = &line[DECLARATION_PREFIX.len()..];
    let content = content.strip_prefix(':').unwrap_or(content);
    let bytes = content.as_bytes();
    let mut data = ExtinfData::default();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' => pos += 1,
            b',' => {
                data.title = Some(content[pos + 1..].trim().to_string());
                break;
            }
            _ => {
                let start = pos;
                while pos < bytes.len() && !matches!(bytes[pos], b'=' | b',' | b' ' | b'\t') {
                    pos += 1;
                }
                let key = &content[start..pos];

                if pos < bytes.len() && bytes[pos] == b'=' {
                    pos += 1;
                    let value = match bytes.get(pos) {
                        Some(&quote) if quote == b'"' || quote == b'\'' => {
                            let value_start = pos + 1;
                            let value_end = content[value_start..]
                                .find(quote as char)
                                .map(|i| value_start + i)
                                .unwrap_or(bytes.len());
                            pos = (value_end + 1).min(bytes.len());
                            &content[value_start..value_end]
                        }
                        _ => {
                            let value_start = pos;
                            while pos < bytes.len() && !matches!(bytes[pos], b',' | b' ' | b'\t') {
                                pos += 1;
                            }
                            &content[value_start..pos]
                        }
                    };
                    if !key.is_empty() {
                        data.attributes
                            .insert(key.to_ascii_lowercase(), value.trim().to_string());
                    }
                } else if data.duration.is_none() && data.attributes.is_empty() {
                    data.duration = key.parse().ok();
                }
            }
        }
    }

    Some(data)
}

/// Normalize text: trim and collapse whitespace runs into single spaces
fn normalize_text(text: &str) -> String {
    MULTI_SPACE_REGEX.replace_all(text.trim(), " ").to_string()
}

/// Find the first `SxxEyy` marker in a text
pub fn detect_episode(text: &str) -> Option<EpisodeNumber> {
    let caps = EPISODE_MARKER.captures(text)?;
    let season = caps.get(1)?.as_str().parse().ok()?;
    let episode = caps.get(2)?.as_str().parse().ok()?;
    Some(EpisodeNumber::new(season, episode))
}

/// Cut a series title at its episode marker ("Show - S01E02 Pilot" -> "Show")
pub fn strip_episode_marker(text: &str) -> String {
    let cut = match EPISODE_MARKER.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };
    cut.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ':' | '.' | '–'))
        .trim()
        .to_string()
}

/// Parse raw playlist text into ordered entries
///
/// Pure and deterministic: the same text always yields the same entries.
/// Entries of unrecognized kind are kept; the aggregator drops them.
pub fn parse_playlist(text: &str) -> Vec<PlaylistEntry> {
    let text = text.trim_start_matches('\u{feff}');
    let lines: Vec<String> = text
        .lines()
        .map(normalize_text)
        .filter(|l| !l.is_empty())
        .collect();

    let mut entries = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let Some(extinf) = parse_extinf(line) else {
            continue;
        };

        // Media locator: next non-comment line before another declaration
        let url = lines[index + 1..]
            .iter()
            .take_while(|l| !is_declaration(l))
            .find(|l| !l.starts_with('#'))
            .cloned();

        let name = extinf.attr("tvg-name").to_string();
        let title = match extinf.title.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => name.clone(),
        };
        let episode = detect_episode(&name).or_else(|| detect_episode(&title));

        entries.push(PlaylistEntry {
            external_id: extinf.attr("tvg-id").to_string(),
            kind: MediaKind::from_declared(extinf.attr("tvg-type")),
            logo: extinf.attr("tvg-logo").to_string(),
            group: extinf.attr("group-title").to_string(),
            name,
            title,
            url,
            episode,
            position: entries.len(),
        });
    }

    tracing::debug!("Parsed {} playlist entries from {} lines", entries.len(), lines.len());
    entries
}
