//! # Pipeline Common
//!
//! A generic, lazily-evaluated, concurrent stream-processing pipeline core.
//!
//! A computation is described by composing a [`pipeline::Pipeline<T>`] out
//! of [`operators`] (`map`, `transform`, `filter`, `tap`), built from the
//! [`topology`] primitives (`source`, `or_done`, `fan_out`, `fan_in`, `tee`,
//! `bridge`). Nothing runs until a [`terminals`] function materialises and
//! drains the description. Every stage and terminal honours a shared
//! [`cancellation::CancellationToken`], and errors travel as data inside
//! [`envelope::Envelope`] rather than aborting sibling stages.
//!
//! ## License
//!
//! MIT OR Apache-2.0

pub mod cancellation;
pub mod envelope;
pub mod error;
pub mod limits;
pub mod meta;
pub mod operators;
pub mod pipeline;
pub mod progress;
pub mod terminals;
pub mod test_utils;
pub mod topology;

pub use cancellation::CancellationToken;
pub use envelope::Envelope;
pub use error::{CoreError, PipelineError};
pub use meta::Meta;
pub use pipeline::{Pipeline, Stream, from_values};
pub use progress::Progress;
