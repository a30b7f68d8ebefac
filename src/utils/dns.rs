use std::{
    net::SocketAddr,
    sync::{Arc, OnceLock},
};

use hickory_resolver::{
    config::ResolverConfig, name_server::TokioConnectionProvider, Resolver, TokioResolver,
};
use log::debug;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};

use crate::config::DnsUpstream;

/// Looks mirror hosts up through a public resolver. Mirror domains are often
/// filtered by ISP resolvers.
#[derive(Debug, Clone)]
pub struct MirrorDnsResolver {
    upstream: DnsUpstream,
    resolver: Arc<OnceLock<TokioResolver>>,
}

impl MirrorDnsResolver {
    /// `None` for [`DnsUpstream::System`], which keeps reqwest's own resolver.
    pub fn new(upstream: DnsUpstream) -> Option<Self> {
        match upstream {
            DnsUpstream::System => None,
            upstream => Some(Self {
                upstream,
                resolver: Arc::default(),
            }),
        }
    }

    fn resolver_config(&self) -> ResolverConfig {
        match self.upstream {
            DnsUpstream::Google => ResolverConfig::google(),
            DnsUpstream::Quad9 => ResolverConfig::quad9(),
            DnsUpstream::Cloudflare | DnsUpstream::System => ResolverConfig::cloudflare(),
        }
    }
}

impl Resolve for MirrorDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let this = self.clone();

        Box::pin(async move {
            let resolver = this.resolver.get_or_init(|| {
                Resolver::builder_with_config(
                    this.resolver_config(),
                    TokioConnectionProvider::default(),
                )
                .build()
            });

            let lookup = resolver.lookup_ip(name.as_str()).await.inspect_err(|err| {
                debug!("[dns] lookup of {} failed: {err}", name.as_str())
            })?;

            let addrs: Addrs = Box::new(lookup.into_iter().map(|ip| SocketAddr::new(ip, 0)));
            Ok(addrs)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_keep_system_resolver() {
        assert!(MirrorDnsResolver::new(DnsUpstream::System).is_none());
        assert!(MirrorDnsResolver::new(DnsUpstream::Quad9).is_some());
    }
}
