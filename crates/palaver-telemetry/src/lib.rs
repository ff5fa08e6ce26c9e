pub mod integration;
pub mod pipeline_metrics;
pub mod stt_metrics;

pub use integration::*;
pub use pipeline_metrics::*;
pub use stt_metrics::*;
