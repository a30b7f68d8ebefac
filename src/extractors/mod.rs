pub mod link;

mod doodstream;
mod dropload;
mod mixdrop;
mod supervideo;

pub use doodstream::DoodstreamResolver;
pub use dropload::DroploadResolver;
pub use mixdrop::MixdropResolver;
pub use supervideo::SupervideoResolver;

use enum_dispatch::enum_dispatch;
use futures::future::BoxFuture;
use log::{debug, info, warn};
use strum_macros::{EnumIter, EnumString, VariantNames};

use crate::{
    config::DEFAULT_MAX_PASSES,
    error::ExtractError,
    fetch::{FetchRequest, Fetcher},
    models::ResolvedLink,
    utils::{
        text::{is_streaming_container, to_absolute_url},
        unpack::unpack_until,
    },
};

use link::LinkExtractor;

/// Per-call collaborators of a resolver.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub fetcher: &'a dyn Fetcher,
    pub max_passes: usize,
}

impl<'a> ResolveContext<'a> {
    pub fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}

/// Turns one mirror page url into a playable link.
#[enum_dispatch]
pub trait MirrorResolver: Send + Sync {
    /// Provider label, used as link name and source.
    fn name(&self) -> &'static str;

    fn resolve<'a>(
        &'a self,
        ctx: ResolveContext<'a>,
        url: &'a str,
        referer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ResolvedLink, ExtractError>>;
}

/// Built-in resolvers, keyed by provider tag.
#[enum_dispatch(MirrorResolver)]
#[derive(EnumIter, EnumString, VariantNames)]
pub enum AllMirrorResolvers {
    #[strum(serialize = "supervideo")]
    SupervideoResolver,
    #[strum(serialize = "mixdrop")]
    MixdropResolver,
    #[strum(serialize = "dropload")]
    DroploadResolver,
    #[strum(serialize = "doodstream")]
    DoodstreamResolver,
}

/// Runs `resolver` and swallows its failure. Fetch and unpack failures are
/// warnings, a page without anything to extract is not.
pub async fn resolve_link(
    resolver: &dyn MirrorResolver,
    ctx: ResolveContext<'_>,
    url: &str,
    referer: Option<&str>,
) -> Option<ResolvedLink> {
    let name = resolver.name();

    match resolver.resolve(ctx, url, referer).await {
        Ok(link) => {
            info!("[{name}] resolved {url} -> {}", link.url);
            Some(link)
        }
        Err(err) if err.is_expected() => {
            debug!("[{name}] nothing found at {url}: {err}");
            None
        }
        Err(err) => {
            warn!("[{name}] failed to resolve {url}: {err}");
            None
        }
    }
}

/// Page fetch parameters of a provider that hides its player in packed scripts.
pub(crate) struct PackedPage<'a> {
    pub name: &'static str,
    pub url: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
    pub extractor: LinkExtractor,
}

/// Fetch, unpack up to `ctx.max_passes` layers, extract and normalize.
pub(crate) async fn resolve_packed_page(
    ctx: ResolveContext<'_>,
    page: PackedPage<'_>,
    referer: Option<&str>,
) -> Result<ResolvedLink, ExtractError> {
    let PackedPage {
        name,
        url,
        headers,
        extractor,
    } = page;

    let mut request = FetchRequest::get(url).with_headers(headers);
    if let Some(referer) = referer {
        request = request.with_referer(referer);
    }

    let res = ctx.fetcher.fetch_text(request).await?.error_for_status()?;
    debug!("[{name}] loaded {} ({} chars)", res.final_url, res.body.len());

    let run = unpack_until(&res.body, ctx.max_passes, |text| extractor.extract(text));
    let layers = run.unpacked_layers();

    let Some(found) = run.found else {
        return Err(match run.error {
            Some(err) => err.into(),
            None if layers == 0 => ExtractError::PayloadNotFound,
            None => ExtractError::NoMatch,
        });
    };

    let url = to_absolute_url(&res.final_url, &found.url).ok_or(ExtractError::NoMatch)?;

    Ok(ResolvedLink {
        name: name.into(),
        source: name.into(),
        is_streaming_container: is_streaming_container(&url),
        url,
        referer: referer.map(str::to_owned).unwrap_or(res.final_url),
        quality: found.quality,
    })
}
