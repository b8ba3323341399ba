//! Common utilities module
//!
//! Error type, timing helpers and the completion slot shared by the
//! background build paths.

pub mod completion;
pub mod error;
pub mod timing;

pub use completion::Completion;
pub use error::{Result, TextureBuildError};
pub use timing::{PipelineTimings, StepTiming, Timer};
