use std::sync::Arc;

use futures::{stream, StreamExt};
use indexmap::IndexMap;
use log::{debug, info};
use strum::{IntoEnumIterator, VariantNames};

use crate::{
    config::EngineConfig,
    extractors::{resolve_link, AllMirrorResolvers, MirrorResolver, ResolveContext},
    fetch::Fetcher,
    models::{MirrorReference, ResolvedLink},
};

/// Provider tag to resolver, in registration order.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: IndexMap<String, Arc<dyn MirrorResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in resolver.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (tag, resolver) in AllMirrorResolvers::VARIANTS
            .iter()
            .zip(AllMirrorResolvers::iter())
        {
            registry.register(*tag, Arc::new(resolver));
        }
        registry
    }

    /// Adds `resolver` under `tag`, returning the one it replaces.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        resolver: Arc<dyn MirrorResolver>,
    ) -> Option<Arc<dyn MirrorResolver>> {
        self.resolvers.insert(tag.into(), resolver)
    }

    /// Tags are matched case-sensitively.
    pub fn get(&self, tag: &str) -> Option<&Arc<dyn MirrorResolver>> {
        self.resolvers.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Links in delivery order.
    pub links: Vec<ResolvedLink>,
    pub any_succeeded: bool,
}

/// Resolves mirror lists with a bounded number of resolutions in flight.
pub struct ExtractionDispatcher {
    registry: ResolverRegistry,
    fetcher: Arc<dyn Fetcher>,
    config: EngineConfig,
}

impl ExtractionDispatcher {
    pub fn new(registry: ResolverRegistry, fetcher: Arc<dyn Fetcher>, config: EngineConfig) -> Self {
        Self {
            registry,
            fetcher,
            config,
        }
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    /// Attempts every reference with a registered tag and hands each link to
    /// `on_link` as soon as its resolution completes. Links arrive one at a
    /// time, in completion order. Dropping the future cancels the resolutions
    /// still in flight.
    pub async fn resolve_all(
        &self,
        refs: &[MirrorReference],
        referer: Option<&str>,
        mut on_link: impl FnMut(&ResolvedLink),
    ) -> DispatchOutcome {
        let ctx = ResolveContext::new(self.fetcher.as_ref()).with_max_passes(self.config.max_passes);

        let resolutions = refs.iter().filter_map(|mirror| {
            let Some(resolver) = self.registry.get(&mirror.provider) else {
                debug!(
                    "[dispatcher] no resolver for '{}', skipping {}",
                    mirror.provider, mirror.url
                );
                return None;
            };

            Some(resolve_link(resolver.as_ref(), ctx, &mirror.url, referer))
        });

        let mut results = stream::iter(resolutions).buffer_unordered(self.config.concurrency.max(1));

        let mut outcome = DispatchOutcome::default();
        while let Some(result) = results.next().await {
            if let Some(link) = result {
                on_link(&link);
                outcome.links.push(link);
            }
        }
        outcome.any_succeeded = !outcome.links.is_empty();

        info!(
            "[dispatcher] {} of {} mirrors resolved",
            outcome.links.len(),
            refs.len()
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        error::ExtractError, fetch::testing::StaticFetcher, models::Quality,
        utils::unpack::packerjs::tests::pack,
    };

    #[derive(Default)]
    struct EchoResolver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl MirrorResolver for EchoResolver {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn resolve<'a>(
            &'a self,
            _ctx: ResolveContext<'a>,
            url: &'a str,
            referer: Option<&'a str>,
        ) -> BoxFuture<'a, Result<ResolvedLink, ExtractError>> {
            Box::pin(async move {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                for _ in 0..3 {
                    tokio::task::yield_now().await;
                }
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if url.contains("fail") {
                    return Err(ExtractError::NoMatch);
                }

                Ok(ResolvedLink {
                    name: "Echo".into(),
                    source: "Echo".into(),
                    url: url.into(),
                    referer: referer.unwrap_or(url).into(),
                    quality: Quality::Unknown,
                    is_streaming_container: false,
                })
            })
        }
    }

    fn echo_dispatcher(concurrency: usize) -> (ExtractionDispatcher, Arc<EchoResolver>) {
        let echo = Arc::new(EchoResolver::default());
        let mut registry = ResolverRegistry::new();
        registry.register("echo", echo.clone());

        let config = EngineConfig {
            concurrency,
            ..Default::default()
        };
        let dispatcher = ExtractionDispatcher::new(registry, Arc::new(StaticFetcher::new()), config);

        (dispatcher, echo)
    }

    #[test]
    fn should_register_defaults_in_order() {
        let registry = ResolverRegistry::with_defaults();

        assert_eq!(
            registry.tags().collect::<Vec<_>>(),
            vec!["supervideo", "mixdrop", "dropload", "doodstream"]
        );
        assert_eq!(registry.get("mixdrop").map(|r| r.name()), Some("Mixdrop"));
        assert!(registry.get("Mixdrop").is_none());
    }

    #[test]
    fn should_replace_registered_resolver() {
        let mut registry = ResolverRegistry::with_defaults();

        let previous = registry.register("mixdrop", Arc::new(EchoResolver::default()));

        assert_eq!(previous.map(|r| r.name()), Some("Mixdrop"));
        assert_eq!(registry.get("mixdrop").map(|r| r.name()), Some("Echo"));
        assert_eq!(registry.tags().count(), 4);
    }

    #[test_log::test(tokio::test)]
    async fn should_deliver_only_successful_links() {
        let player = r#"jwplayer("vplayer").setup({sources:[{file:"https://cdn.example.com/hls/master.m3u8"}]});"#;
        let fetcher = StaticFetcher::new()
            .page(
                "https://supervideo.cc/e/ok",
                format!("<script>{}</script>", pack(player, 36)),
            )
            .status("https://mixdrop.ps/e/gone", 404);

        let dispatcher = ExtractionDispatcher::new(
            ResolverRegistry::with_defaults(),
            Arc::new(fetcher),
            EngineConfig::default(),
        );

        let refs = vec![
            MirrorReference::new("https://mixdrop.ps/f/gone", "mixdrop"),
            MirrorReference::new("https://supervideo.cc/e/ok", "supervideo"),
            MirrorReference::new("https://dropload.io/embed-down.html", "dropload"),
        ];

        let mut delivered = vec![];
        let outcome = dispatcher
            .resolve_all(&refs, Some("https://site.example/film"), |link| {
                delivered.push(link.url.clone())
            })
            .await;

        assert_eq!(delivered, vec!["https://cdn.example.com/hls/master.m3u8"]);
        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].referer, "https://site.example/film");
        assert!(outcome.any_succeeded);
    }

    #[tokio::test]
    async fn should_report_no_success_when_all_fail() {
        let dispatcher = ExtractionDispatcher::new(
            ResolverRegistry::with_defaults(),
            Arc::new(StaticFetcher::new()),
            EngineConfig::default(),
        );

        let refs = vec![
            MirrorReference::new("https://supervideo.cc/e/a", "supervideo"),
            MirrorReference::new("https://mixdrop.ps/f/b", "mixdrop"),
            MirrorReference::new("https://dood.re/e/c", "doodstream"),
        ];

        let mut calls = 0;
        let outcome = dispatcher.resolve_all(&refs, None, |_| calls += 1).await;

        assert_eq!(calls, 0);
        assert_eq!(outcome, DispatchOutcome::default());
    }

    #[tokio::test]
    async fn should_skip_unknown_tags() {
        let (dispatcher, echo) = echo_dispatcher(4);

        let refs = vec![
            MirrorReference::new("https://unknown.example/1", "streamtape"),
            MirrorReference::new("https://echo.example/2", "echo"),
            MirrorReference::new("https://echo.example/3", "Echo"),
        ];

        let outcome = dispatcher.resolve_all(&refs, None, |_| {}).await;

        assert_eq!(outcome.links.len(), 1);
        assert_eq!(outcome.links[0].url, "https://echo.example/2");
        assert_eq!(echo.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_attempt_every_reference_within_concurrency_bound() {
        let (dispatcher, echo) = echo_dispatcher(2);

        let refs: Vec<_> = (0..6)
            .map(|i| {
                let url = if i % 3 == 0 {
                    format!("https://echo.example/fail/{i}")
                } else {
                    format!("https://echo.example/{i}")
                };
                MirrorReference::new(url, "echo")
            })
            .collect();

        let mut delivered = 0;
        let outcome = dispatcher.resolve_all(&refs, None, |_| delivered += 1).await;

        assert_eq!(delivered, 4);
        assert_eq!(outcome.links.len(), 4);
        assert!(outcome.any_succeeded);
        assert_eq!(echo.peak.load(Ordering::SeqCst), 2);
        assert_eq!(echo.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_deliver_in_order_without_concurrency() {
        let (dispatcher, echo) = echo_dispatcher(1);

        let refs: Vec<_> = (0..4)
            .map(|i| MirrorReference::new(format!("https://echo.example/{i}"), "echo"))
            .collect();

        let mut delivered = vec![];
        dispatcher
            .resolve_all(&refs, None, |link| delivered.push(link.url.clone()))
            .await;

        assert_eq!(
            delivered,
            refs.iter().map(|r| r.url.clone()).collect::<Vec<_>>()
        );
        assert_eq!(echo.peak.load(Ordering::SeqCst), 1);
    }
}
