pub mod assemble;
pub mod batch;
pub mod behavior;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod external;
pub mod lexical;
pub mod record;
pub mod report;
pub mod schema;
pub mod structural;

pub use assemble::{Assembled, assemble};
pub use batch::{
    BatchOptions, BatchProgressCallback, UrlAnalysis, analyze_offline, analyze_url, execute_batch,
    load_urls,
};
pub use dataset::{DatasetOptions, DatasetReport, normalize_dataset, normalize_file};
pub use error::CoreError;
pub use lexical::{UrlComponents, analyze_lexical};
pub use record::{Fallback, FallbackReason, FeatureRecord, PartialRecord, Ternary};
pub use schema::{FeatureKey, Label, RawValue, normalize_column};
pub use structural::{analyze_html, analyze_structure};
