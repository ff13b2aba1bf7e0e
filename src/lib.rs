pub mod analyzers;
pub mod clean;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod record;
pub mod stats;
pub mod warehouse;

pub use analyzers::aggregate::aggregate;
pub use analyzers::summary::summarize;
pub use clean::clean;
pub use error::{EtlError, SkipReason};
pub use parser::load;
