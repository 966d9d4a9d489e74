//! Analysis pipelines: session polling, chunked captioning, and the
//! orchestrator that fans them out per request.

pub mod caption;
pub mod orchestrator;
pub mod session;

pub use caption::CaptionPipeline;
pub use orchestrator::Analyzer;
pub use session::SessionPipeline;
