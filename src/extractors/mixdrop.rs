use std::borrow::Cow;

use futures::future::BoxFuture;

use crate::{error::ExtractError, models::ResolvedLink};

use super::{
    link::{LinkExtractor, MediaPattern},
    resolve_packed_page, MirrorResolver, PackedPage, ResolveContext,
};

const NAME: &str = "Mixdrop";

const EXTRACTOR: LinkExtractor = LinkExtractor::new(&[MediaPattern::GlobalAssignment]);

#[derive(Debug, Default, Clone, Copy)]
pub struct MixdropResolver;

impl MirrorResolver for MixdropResolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn resolve<'a>(
        &'a self,
        ctx: ResolveContext<'a>,
        url: &'a str,
        referer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ResolvedLink, ExtractError>> {
        Box::pin(async move {
            let iframe_url = embed_url(url);

            resolve_packed_page(
                ctx,
                PackedPage {
                    name: NAME,
                    url: &iframe_url,
                    headers: &[],
                    extractor: EXTRACTOR,
                },
                referer,
            )
            .await
        })
    }
}

/// File pages (`/f/<id>`) only link to the player, the embed page (`/e/<id>`) has it.
fn embed_url(url: &str) -> Cow<'_, str> {
    let url = url.split_once('?').map(|(path, _)| path).unwrap_or(url);

    if url.contains("/f/") {
        Cow::Owned(url.replace("/f/", "/e/"))
    } else {
        Cow::Borrowed(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fetch::testing::StaticFetcher, utils::unpack::packerjs::tests::pack};

    const PLAYER: &str = r#"MDCore.ref="364x6xlmtdp1p7";MDCore.poster="//s-delivery38.mxdcontent.net/thumbs/poster.jpg";MDCore.wurl="//s-delivery38.mxdcontent.net/v/6b8a1c0e.mp4?s=Vw2kA&e=1700000000&_t=1699990000";"#;

    #[test]
    fn should_rewrite_file_url_to_embed() {
        assert_eq!(
            embed_url("https://mixdrop.ps/f/364x6xlmtdp1p7?download=1"),
            "https://mixdrop.ps/e/364x6xlmtdp1p7"
        );
        assert_eq!(
            embed_url("https://mixdrop.ps/e/364x6xlmtdp1p7"),
            "https://mixdrop.ps/e/364x6xlmtdp1p7"
        );
    }

    #[test_log::test(tokio::test)]
    async fn should_resolve_from_embed_page() {
        let page = format!(
            "<script>\n{}\n</script><script>var other = 1;</script>",
            pack(PLAYER, 36)
        );
        let fetcher = StaticFetcher::new().page("https://mixdrop.ps/e/364x6xlmtdp1p7", page);

        let link = MixdropResolver
            .resolve(
                ResolveContext::new(&fetcher),
                "https://mixdrop.ps/f/364x6xlmtdp1p7?download=1",
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            link.url,
            "https://s-delivery38.mxdcontent.net/v/6b8a1c0e.mp4?s=Vw2kA&e=1700000000&_t=1699990000"
        );
        assert_eq!(link.referer, "https://mixdrop.ps/e/364x6xlmtdp1p7");
        assert!(!link.is_streaming_container);
    }

    #[tokio::test]
    async fn should_not_match_player_file_pattern() {
        let page = pack(r#"setup({file:"https://cdn.example.com/v.mp4"})"#, 10);
        let fetcher = StaticFetcher::new().page("https://mixdrop.ps/e/abc", page);

        let err = MixdropResolver
            .resolve(ResolveContext::new(&fetcher), "https://mixdrop.ps/e/abc", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::NoMatch));
    }

    #[tokio::test]
    async fn should_fail_on_error_status() {
        let fetcher = StaticFetcher::new().status("https://mixdrop.ps/e/abc", 404);

        let link = super::super::resolve_link(
            &MixdropResolver,
            ResolveContext::new(&fetcher),
            "https://mixdrop.ps/f/abc",
            None,
        )
        .await;

        assert_eq!(link, None);
    }
}
