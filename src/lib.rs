pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod mirrors;
pub mod models;
pub mod streams;
mod utils;

pub use config::{DnsUpstream, EngineConfig};
pub use dispatcher::{DispatchOutcome, ExtractionDispatcher, ResolverRegistry};
pub use error::ExtractError;
pub use extractors::{resolve_link, AllMirrorResolvers, MirrorResolver, ResolveContext};
pub use fetch::{FetchRequest, FetchResponse, Fetcher, ReqwestFetcher};
pub use models::{MirrorReference, ProviderTag, Quality, ResolvedLink};
pub use utils::unpack::{locate_packed, packerjs::{detect, unpack, UnpackError}};
