use std::sync::OnceLock;

use regex::Regex;

use crate::{
    models::Quality,
    utils::text::{is_streaming_container, to_full_url},
};

/// Shapes a media url takes in player scripts. Every pattern requires a
/// `.m3u8` or `.mp4` suffix before any query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPattern {
    /// `file: "…"` in a player setup.
    PlayerFile,
    /// `sources: [{ src: "…" }]`.
    SourcesSrc,
    /// `"hls2": "…"` style maps.
    HlsMap,
    /// `MDCore.wurl = "…"` style global assignments.
    GlobalAssignment,
    /// First argument of an `onclick` `window.open('…')`.
    WindowOpen,
    /// Any literal `https://…` media url.
    BareUrl,
}

impl MediaPattern {
    /// All patterns in priority order.
    pub const ALL: &'static [MediaPattern] = &[
        MediaPattern::PlayerFile,
        MediaPattern::SourcesSrc,
        MediaPattern::HlsMap,
        MediaPattern::GlobalAssignment,
        MediaPattern::WindowOpen,
        MediaPattern::BareUrl,
    ];

    fn regex(self) -> &'static Regex {
        static PLAYER_FILE_RE: OnceLock<Regex> = OnceLock::new();
        static SOURCES_SRC_RE: OnceLock<Regex> = OnceLock::new();
        static HLS_MAP_RE: OnceLock<Regex> = OnceLock::new();
        static GLOBAL_ASSIGNMENT_RE: OnceLock<Regex> = OnceLock::new();
        static WINDOW_OPEN_RE: OnceLock<Regex> = OnceLock::new();
        static BARE_URL_RE: OnceLock<Regex> = OnceLock::new();

        let (cell, pattern) = match self {
            MediaPattern::PlayerFile => (
                &PLAYER_FILE_RE,
                r#"\bfile["']?\s*:\s*["'](?<url>[^"']+\.(?:m3u8|mp4)[^"']*)["']"#,
            ),
            MediaPattern::SourcesSrc => (
                &SOURCES_SRC_RE,
                r#"sources["']?\s*:\s*\[\s*\{[^}]*?\bsrc["']?\s*:\s*["'](?<url>[^"']+\.(?:m3u8|mp4)[^"']*)["']"#,
            ),
            MediaPattern::HlsMap => (
                &HLS_MAP_RE,
                r#"["']hls\d*["']\s*:\s*["'](?<url>[^"']+\.(?:m3u8|mp4)[^"']*)["']"#,
            ),
            MediaPattern::GlobalAssignment => (
                &GLOBAL_ASSIGNMENT_RE,
                r#"MDCore\.\w+\s*=\s*["'](?<url>[^"']+\.(?:m3u8|mp4)[^"']*)["']"#,
            ),
            MediaPattern::WindowOpen => (
                &WINDOW_OPEN_RE,
                r#"window\.open\(\s*["'](?<url>[^"']+\.(?:m3u8|mp4)[^"']*)["']"#,
            ),
            MediaPattern::BareUrl => (
                &BARE_URL_RE,
                r#"(?<url>https?://[^\s"'<>\\]+\.(?:m3u8|mp4)(?:\?[^\s"'<>\\]*)?)"#,
            ),
        };

        cell.get_or_init(|| Regex::new(pattern).unwrap())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMatch {
    pub url: String,
    pub quality: Quality,
    pub is_streaming_container: bool,
}

/// Ordered set of [`MediaPattern`]s. The first pattern that matches wins.
#[derive(Debug, Clone, Copy)]
pub struct LinkExtractor {
    patterns: &'static [MediaPattern],
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(MediaPattern::ALL)
    }
}

impl LinkExtractor {
    pub const fn new(patterns: &'static [MediaPattern]) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &'static [MediaPattern] {
        self.patterns
    }

    pub fn extract(&self, text: &str) -> Option<MediaMatch> {
        let found = self.patterns.iter().find_map(|pattern| {
            pattern
                .regex()
                .captures(text)
                .and_then(|caps| caps.name("url"))
        })?;

        let url = to_full_url(&found.as_str().replace("\\/", "/"));

        Some(MediaMatch {
            is_streaming_container: is_streaming_container(&url),
            quality: quality_hint(enclosing_object(text, found.start(), found.end())),
            url,
        })
    }
}

/// The innermost `{…}` around `start..end`, or an empty scope outside any object.
fn enclosing_object(text: &str, start: usize, end: usize) -> &str {
    let before = &text[..start];
    let Some(open) = before.rfind('{') else {
        return "";
    };
    if before.rfind('}').is_some_and(|close| close > open) {
        return "";
    }

    let close = text[end..].find('}').map_or(text.len(), |idx| end + idx);
    &text[open..close]
}

fn quality_hint(text: &str) -> Quality {
    static LABEL_RE: OnceLock<Regex> = OnceLock::new();

    LABEL_RE
        .get_or_init(|| Regex::new(r#"\blabel["']?\s*:\s*["'](?<label>\d{3,4})[pP]?["']"#).unwrap())
        .captures(text)
        .and_then(|caps| caps.name("label"))
        .map(|label| Quality::from_label(label.as_str()))
        .unwrap_or_default()
}
