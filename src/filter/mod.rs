pub mod debounce;
pub mod error;
pub mod pipeline;
pub mod types;

pub use debounce::Debouncer;
pub use error::FilterError;
pub use pipeline::QueryPipeline;
pub use types::{FilterSnapshot, RideFilter};
