pub mod error;
pub mod fetcher;
pub mod lookup;
pub mod result;

pub use error::{FetchError, LookupError};
pub use fetcher::{Fetcher, ProgressCallback};
pub use lookup::{
    CompositeLookup, DnsLookup, DomainLookup, LookupResult, PageRankClient, StaticLookup,
    WhoisClient, WhoisRecord,
};
pub use result::FetchResult;
