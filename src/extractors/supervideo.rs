use futures::future::BoxFuture;

use crate::{error::ExtractError, models::ResolvedLink};

use super::{
    link::{LinkExtractor, MediaPattern},
    resolve_packed_page, MirrorResolver, PackedPage, ResolveContext,
};

const NAME: &str = "Supervideo";

// the embed page answers with an empty player to non-browser clients
const HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
    ("Accept", "*/*"),
    ("Connection", "keep-alive"),
];

const EXTRACTOR: LinkExtractor = LinkExtractor::new(&[
    MediaPattern::PlayerFile,
    MediaPattern::HlsMap,
    MediaPattern::SourcesSrc,
    MediaPattern::BareUrl,
]);

#[derive(Debug, Default, Clone, Copy)]
pub struct SupervideoResolver;

impl MirrorResolver for SupervideoResolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn resolve<'a>(
        &'a self,
        ctx: ResolveContext<'a>,
        url: &'a str,
        referer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ResolvedLink, ExtractError>> {
        Box::pin(resolve_packed_page(
            ctx,
            PackedPage {
                name: NAME,
                url,
                headers: HEADERS,
                extractor: EXTRACTOR,
            },
            referer,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::testing::StaticFetcher, models::Quality, utils::unpack::packerjs::tests::pack,
    };

    const URL: &str = "https://supervideo.cc/e/n1kbhx78xlja";
    const PLAYER: &str = r#"var vplayer=jwplayer("vplayer");vplayer.setup({sources:[{file:"https://hfs301.serversicuro.cc/hls/,dnq3ytzk,.urlset/master.m3u8",label:"720p"}],image:"https://supervideo.cc/poster.jpg",width:"100%"});"#;

    #[test_log::test(tokio::test)]
    async fn should_resolve_packed_player() {
        let page = format!(
            "<html><body><div id=\"vplayer\"></div><script type='text/javascript'>{}</script></body></html>",
            pack(PLAYER, 36)
        );
        let fetcher = StaticFetcher::new().page(URL, page);

        let link = SupervideoResolver
            .resolve(ResolveContext::new(&fetcher), URL, Some("https://site.example/film/1"))
            .await
            .unwrap();

        assert_eq!(
            link.url,
            "https://hfs301.serversicuro.cc/hls/,dnq3ytzk,.urlset/master.m3u8"
        );
        assert_eq!(link.name, "Supervideo");
        assert_eq!(link.source, "Supervideo");
        assert_eq!(link.referer, "https://site.example/film/1");
        assert_eq!(link.quality, Quality::P720);
        assert!(link.is_streaming_container);
    }

    #[tokio::test]
    async fn should_resolve_nested_packing() {
        let nested = (0..3).fold(PLAYER.to_owned(), |script, _| pack(&script, 62));
        let fetcher = StaticFetcher::new().page(URL, format!("<script>{nested}</script>"));

        let link = SupervideoResolver
            .resolve(ResolveContext::new(&fetcher), URL, None)
            .await
            .unwrap();

        assert!(link.url.ends_with("/master.m3u8"));
        assert_eq!(link.referer, URL);
    }

    #[tokio::test]
    async fn should_give_up_past_max_passes() {
        let nested = (0..3).fold(PLAYER.to_owned(), |script, _| pack(&script, 36));
        let fetcher = StaticFetcher::new().page(URL, format!("<script>{nested}</script>"));

        let err = SupervideoResolver
            .resolve(ResolveContext::new(&fetcher).with_max_passes(2), URL, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::NoMatch));
    }

    #[tokio::test]
    async fn should_fail_on_error_status() {
        let fetcher = StaticFetcher::new().status(URL, 404);

        let err = SupervideoResolver
            .resolve(ResolveContext::new(&fetcher), URL, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Fetch(_)));
    }

    #[tokio::test]
    async fn should_report_page_without_payload() {
        let fetcher = StaticFetcher::new().page(URL, "<html></html>");

        let err = SupervideoResolver
            .resolve(ResolveContext::new(&fetcher), URL, None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::PayloadNotFound));
        assert_eq!(fetcher.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
