use std::sync::{Arc, OnceLock};

use crate::{
    config::EngineConfig,
    dispatcher::{ExtractionDispatcher, ResolverRegistry},
    fetch::{Fetcher, ReqwestFetcher},
    mirrors,
    models::{MirrorReference, ProviderTag, ResolvedLink},
    streams,
};

/// Sets up `env_logger` once, controlled by `RUST_LOG`. Later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

pub fn available_resolvers() -> Vec<String> {
    ResolverRegistry::with_defaults()
        .tags()
        .map(str::to_owned)
        .collect()
}

pub fn detect_provider(url: &str) -> Option<String> {
    ProviderTag::detect(url).map(|tag| tag.to_string())
}

/// Builds a dispatcher with every built-in resolver and the default http client.
/// `config_json` fields that are missing keep their defaults.
pub fn create_dispatcher(config_json: Option<&str>) -> anyhow::Result<ExtractionDispatcher> {
    let config = match config_json {
        Some(json) => EngineConfig::from_json(json)?,
        None => EngineConfig::default(),
    };
    let fetcher = ReqwestFetcher::new(&config)?;

    Ok(ExtractionDispatcher::new(
        ResolverRegistry::with_defaults(),
        Arc::new(fetcher),
        config,
    ))
}

/// Resolves a `url|tag||url|tag` mirror list with the shared default
/// dispatcher. Returns whether at least one link was delivered.
pub async fn resolve_mirrors(
    data: &str,
    referer: Option<&str>,
    on_link: impl FnMut(&ResolvedLink),
) -> anyhow::Result<bool> {
    resolve_mirrors_with(default_dispatcher()?, data, referer, on_link).await
}

pub async fn resolve_mirrors_with(
    dispatcher: &ExtractionDispatcher,
    data: &str,
    referer: Option<&str>,
    on_link: impl FnMut(&ResolvedLink),
) -> anyhow::Result<bool> {
    let refs = MirrorReference::parse_list(data);
    let outcome = dispatcher.resolve_all(&refs, referer, on_link).await;

    Ok(outcome.any_succeeded)
}

/// Mirror list of an inline download table, in the `url|tag||url|tag` format.
pub fn collect_download_table(html: &str) -> String {
    MirrorReference::encode_list(&mirrors::collect_from_download_table(html))
}

/// Like [`collect_download_table`], falling back to the page's external
/// download script.
pub async fn load_download_table(html: &str, referer: Option<&str>) -> anyhow::Result<String> {
    let dispatcher = default_dispatcher()?;
    let refs = mirrors::collect_mirrors(dispatcher.fetcher(), html, referer).await?;

    Ok(MirrorReference::encode_list(&refs))
}

/// Resolves the playlists of a live-stream page with the shared http client.
/// Returns whether at least one link was delivered.
pub async fn resolve_live_stream(
    url: &str,
    referer: Option<&str>,
    on_link: impl FnMut(&ResolvedLink),
) -> anyhow::Result<bool> {
    resolve_live_stream_with(default_dispatcher()?.fetcher(), url, referer, on_link).await
}

pub async fn resolve_live_stream_with(
    fetcher: &dyn Fetcher,
    url: &str,
    referer: Option<&str>,
    mut on_link: impl FnMut(&ResolvedLink),
) -> anyhow::Result<bool> {
    let links = streams::resolve_stream_page(fetcher, url, referer).await?;
    for link in &links {
        on_link(link);
    }

    Ok(!links.is_empty())
}

fn default_dispatcher() -> anyhow::Result<&'static ExtractionDispatcher> {
    static DISPATCHER: OnceLock<ExtractionDispatcher> = OnceLock::new();

    if let Some(dispatcher) = DISPATCHER.get() {
        return Ok(dispatcher);
    }

    let dispatcher = create_dispatcher(None)?;
    Ok(DISPATCHER.get_or_init(|| dispatcher))
}
