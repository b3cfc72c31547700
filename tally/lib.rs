#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod aggregate;
pub mod dictionary;
pub mod filter;
pub mod io;
pub mod normalize;
pub mod pipeline;
pub mod types;

#[path = "../shared/files.rs"]
pub mod shared_files;

pub mod shared {
    pub use super::shared_files as files;
}

pub use pipeline::{PipelineConfig, PipelineError, search, search_with_config};
pub use types::{Dictionary, FrequencyMap, SearchSummary};
