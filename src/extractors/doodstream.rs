use std::sync::OnceLock;

use futures::future::BoxFuture;
use log::debug;
use rand::{distr::Alphanumeric, Rng};
use regex::Regex;
use url::Url;

use crate::{
    error::ExtractError,
    fetch::FetchRequest,
    models::{Quality, ResolvedLink},
    utils::text::is_streaming_container,
};

use super::{MirrorResolver, ResolveContext};

const NAME: &str = "Doodstream";

/// Doodstream pages carry no packed player. The media url is assembled from
/// the `/pass_md5/` response plus a random suffix, token and expiry.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoodstreamResolver;

impl MirrorResolver for DoodstreamResolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn resolve<'a>(
        &'a self,
        ctx: ResolveContext<'a>,
        url: &'a str,
        referer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ResolvedLink, ExtractError>> {
        Box::pin(extract(ctx, url, referer))
    }
}

async fn extract(
    ctx: ResolveContext<'_>,
    url: &str,
    referer: Option<&str>,
) -> Result<ResolvedLink, ExtractError> {
    static MD5_PASS_RE: OnceLock<Regex> = OnceLock::new();

    let parsed = Url::parse(url).map_err(ExtractError::fetch)?;
    let id = parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .ok_or(ExtractError::NoMatch)?;
    let host = parsed.origin().ascii_serialization();

    let iframe_url = format!("{host}/e/{id}");

    let mut request = FetchRequest::get(&iframe_url);
    if let Some(referer) = referer {
        request = request.with_referer(referer);
    }
    let iframe = ctx.fetcher.fetch_text(request).await?.error_for_status()?;

    let md5_pass = MD5_PASS_RE
        .get_or_init(|| Regex::new(r#"/pass_md5/(?<pass>[^'"\s]+)"#).unwrap())
        .captures(&iframe.body)
        .and_then(|caps| Some(caps.name("pass")?.as_str()))
        .ok_or(ExtractError::PayloadNotFound)?;

    debug!("[{NAME}] md5 pass found: {md5_pass}");

    let pass_url = format!("{host}/pass_md5/{md5_pass}");
    let media_link_part = ctx
        .fetcher
        .fetch_text(FetchRequest::get(&pass_url).with_referer(&iframe.final_url))
        .await?
        .error_for_status()?;

    let media_link_part = media_link_part.body.trim();
    if !media_link_part.starts_with("http") {
        return Err(ExtractError::NoMatch);
    }

    let token = md5_pass.rsplit('/').next().unwrap_or(md5_pass);
    let now = chrono::Utc::now();
    let media_link = format!(
        "{media_link_part}{}?token={token}&expiry={}",
        random_suffix(),
        now.timestamp_millis()
    );

    Ok(ResolvedLink {
        name: NAME.into(),
        source: NAME.into(),
        is_streaming_container: is_streaming_container(&media_link),
        url: media_link,
        referer: iframe.final_url,
        quality: Quality::Unknown,
    })
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}
