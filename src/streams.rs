//! Live-stream pages that expose their playlists directly or through the
//! resources their scripts `fetch(…)`.

use std::sync::OnceLock;

use indexmap::IndexSet;
use log::{debug, info};
use regex::Regex;
use reqwest::Method;

use crate::{
    error::ExtractError,
    fetch::{FetchRequest, FetchResponse, Fetcher},
    models::{Quality, ResolvedLink},
    utils::text::to_absolute_url,
};

const NAME: &str = "Stream";

/// A resource requested by a page script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchCall {
    pub method: Method,
    pub url: String,
}

/// Distinct `.m3u8` urls, in order of first appearance.
pub fn collect_playlist_urls(text: &str) -> Vec<String> {
    static PLAYLIST_RE: OnceLock<Regex> = OnceLock::new();

    PLAYLIST_RE
        .get_or_init(|| Regex::new(r#"https?://[^\s"'<>\\]+\.m3u8"#).unwrap())
        .find_iter(text)
        .map(|m| m.as_str().to_owned())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// `fetch("…")` and `fetch({url: "…", method: "…"})` calls with a literal url.
/// Anything but `POST` is fetched with `GET`.
pub fn collect_fetch_calls(text: &str) -> Vec<FetchCall> {
    static FETCH_RE: OnceLock<Regex> = OnceLock::new();
    static QUOTED_RE: OnceLock<Regex> = OnceLock::new();
    static URL_FIELD_RE: OnceLock<Regex> = OnceLock::new();
    static METHOD_FIELD_RE: OnceLock<Regex> = OnceLock::new();

    FETCH_RE
        .get_or_init(|| Regex::new(r"\bfetch\((?<arg>.*?)\)").unwrap())
        .captures_iter(text)
        .filter_map(|caps| {
            let arg = caps.name("arg")?.as_str().trim();

            if arg.starts_with('{') {
                let url = URL_FIELD_RE
                    .get_or_init(|| {
                        Regex::new(r#"["']?\burl["']?\s*:\s*["'](?<url>[^"']+)["']"#).unwrap()
                    })
                    .captures(arg)?
                    .name("url")?
                    .as_str();
                let is_post = METHOD_FIELD_RE
                    .get_or_init(|| {
                        Regex::new(r#"["']?\bmethod["']?\s*:\s*["'](?<method>\w+)["']"#).unwrap()
                    })
                    .captures(arg)
                    .and_then(|caps| caps.name("method"))
                    .is_some_and(|method| method.as_str().eq_ignore_ascii_case("post"));

                Some(FetchCall {
                    method: if is_post { Method::POST } else { Method::GET },
                    url: url.to_owned(),
                })
            } else {
                let url = QUOTED_RE
                    .get_or_init(|| Regex::new(r#"^["'](?<url>[^"']+)["']"#).unwrap())
                    .captures(arg)?
                    .name("url")?
                    .as_str();

                Some(FetchCall {
                    method: Method::GET,
                    url: url.to_owned(),
                })
            }
        })
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Every playlist a live-stream page exposes: the ones written in the page
/// first, then the ones returned by the resources its scripts fetch. A failing
/// secondary fetch is skipped.
pub async fn resolve_stream_page(
    fetcher: &dyn Fetcher,
    url: &str,
    referer: Option<&str>,
) -> Result<Vec<ResolvedLink>, ExtractError> {
    let mut request = FetchRequest::get(url);
    if let Some(referer) = referer {
        request = request.with_referer(referer);
    }
    let page = fetcher.fetch_text(request).await?.error_for_status()?;

    let mut links = vec![];
    for playlist in collect_playlist_urls(&page.body) {
        push_stream_link(&mut links, "Direct", playlist, &page.final_url);
    }

    for call in collect_fetch_calls(&page.body) {
        let Some(call_url) = to_absolute_url(&page.final_url, &call.url) else {
            debug!("[{NAME}] unusable fetch target: {}", call.url);
            continue;
        };

        let request = if call.method == Method::POST {
            FetchRequest::post(&call_url)
        } else {
            FetchRequest::get(&call_url)
        };
        let request = request.with_referer(&page.final_url);

        let res = match fetcher
            .fetch_text(request)
            .await
            .and_then(FetchResponse::error_for_status)
        {
            Ok(res) => res,
            Err(err) => {
                debug!("[{NAME}] skipping {} {call_url}: {err}", call.method);
                continue;
            }
        };

        for playlist in collect_playlist_urls(&res.body) {
            push_stream_link(&mut links, "Fetch", playlist, &call_url);
        }
    }

    info!("[{NAME}] {} playlists found at {}", links.len(), page.final_url);

    Ok(links)
}

fn push_stream_link(links: &mut Vec<ResolvedLink>, source: &str, url: String, referer: &str) {
    if links.iter().any(|link| link.url == url) {
        return;
    }

    links.push(ResolvedLink {
        name: NAME.into(),
        source: source.into(),
        url,
        referer: referer.into(),
        quality: Quality::Unknown,
        is_streaming_container: true,
    });
}
