use futures::future::BoxFuture;

use crate::{error::ExtractError, models::ResolvedLink};

use super::{
    link::{LinkExtractor, MediaPattern},
    resolve_packed_page, MirrorResolver, PackedPage, ResolveContext,
};

const NAME: &str = "Dropload";

const EXTRACTOR: LinkExtractor = LinkExtractor::new(&[
    MediaPattern::PlayerFile,
    MediaPattern::SourcesSrc,
    MediaPattern::HlsMap,
    MediaPattern::WindowOpen,
    MediaPattern::BareUrl,
]);

#[derive(Debug, Default, Clone, Copy)]
pub struct DroploadResolver;

impl MirrorResolver for DroploadResolver {
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
                headers: &[],
                extractor: EXTRACTOR,
            },
            referer,
        ))
    }
}
