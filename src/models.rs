use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

/// Hosting providers with a built-in resolver.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    IntoStaticStr,
    EnumString,
    EnumIter,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    Supervideo,
    Mixdrop,
    Dropload,
    Doodstream,
}

impl ProviderTag {
    /// Guesses the provider from a mirror url, e.g. `https://supervideo.cc/e/xyz`.
    pub fn detect(url: &str) -> Option<ProviderTag> {
        use strum::IntoEnumIterator;

        ProviderTag::iter().find(|tag| url.contains(tag.as_ref()))
    }
}

/// One mirror of a playable item as produced by a site scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorReference {
    pub url: String,
    /// Raw provider tag, matched case-sensitively against registered resolvers.
    pub provider: String,
}

impl MirrorReference {
    pub fn new(url: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            provider: provider.into(),
        }
    }

    /// Parses the `url|tag||url|tag` list format. Malformed entries are dropped.
    pub fn parse_list(data: &str) -> Vec<MirrorReference> {
        data.split("||")
            .filter_map(|entry| {
                let parts: Vec<_> = entry.split('|').collect();
                match parts.as_slice() {
                    [url, provider] if !url.is_empty() => Some(MirrorReference::new(*url, *provider)),
                    _ => None,
                }
            })
            .collect()
    }

    pub fn encode_list(refs: &[MirrorReference]) -> String {
        refs.iter()
            .map(|r| format!("{}|{}", r.url, r.provider))
            .collect::<Vec<_>>()
            .join("||")
    }
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
pub enum Quality {
    #[default]
    #[strum(serialize = "unknown")]
    Unknown,
    #[strum(serialize = "360p")]
    P360,
    #[strum(serialize = "480p")]
    P480,
    #[strum(serialize = "720p")]
    P720,
    #[strum(serialize = "1080p")]
    P1080,
    #[strum(serialize = "1440p")]
    P1440,
    #[strum(serialize = "2160p")]
    P2160,
}

impl Quality {
    /// Maps a player label such as `720p` or `1080` to a quality.
    pub fn from_label(label: &str) -> Quality {
        let height = label
            .trim()
            .trim_end_matches(['p', 'P'])
            .parse::<u32>()
            .unwrap_or_default();

        match height {
            0 => Quality::Unknown,
            1..=360 => Quality::P360,
            361..=480 => Quality::P480,
            481..=720 => Quality::P720,
            721..=1080 => Quality::P1080,
            1081..=1440 => Quality::P1440,
            _ => Quality::P2160,
        }
    }
}

/// Playable link handed to the caller. `url` is always absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLink {
    pub name: String,
    pub source: String,
    pub url: String,
    pub referer: String,
    pub quality: Quality,
    pub is_streaming_container: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn should_parse_mirror_list() {
        let refs = MirrorReference::parse_list(
            "https://supervideo.cc/e/abc|supervideo||broken||https://mixdrop.sb/f/xyz|mixdrop",
        );

        assert_eq!(
            refs,
            vec![
                MirrorReference::new("https://supervideo.cc/e/abc", "supervideo"),
                MirrorReference::new("https://mixdrop.sb/f/xyz", "mixdrop"),
            ]
        );
        assert_eq!(
            MirrorReference::encode_list(&refs),
            "https://supervideo.cc/e/abc|supervideo||https://mixdrop.sb/f/xyz|mixdrop"
        );
    }

    #[test]
    fn should_ignore_empty_mirror_list() {
        assert!(MirrorReference::parse_list("").is_empty());
    }

    #[test]
    fn should_detect_provider_from_url() {
        assert_eq!(
            ProviderTag::detect("https://dropload.io/embed-1.html"),
            Some(ProviderTag::Dropload)
        );
        assert_eq!(ProviderTag::detect("https://mostraguarda.stream/x"), None);
    }

    #[test]
    fn should_parse_provider_tag_case_sensitive() {
        assert_eq!(ProviderTag::from_str("mixdrop").ok(), Some(ProviderTag::Mixdrop));
        assert!(ProviderTag::from_str("Mixdrop").is_err());
        assert_eq!(ProviderTag::Doodstream.to_string(), "doodstream");
    }

    #[test]
    fn should_map_quality_labels() {
        assert_eq!(Quality::from_label("720p"), Quality::P720);
        assert_eq!(Quality::from_label("1080"), Quality::P1080);
        assert_eq!(Quality::from_label("auto"), Quality::Unknown);
        assert_eq!(Quality::default().to_string(), "unknown");
        assert_eq!(Quality::P1080.to_string(), "1080p");
        assert_eq!(Quality::from_label("2160p").to_string(), "2160p");
    }
}
