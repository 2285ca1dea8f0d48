//! Scheduler module for orbsh: pipeline execution.
//!
//! Stages of a matched line run strictly in order. Each stage sees the
//! previous stage's value as its input; the first failure stops the line.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   PipelineRunner                     │
//! │  ┌─────────┐  value  ┌─────────┐  value  ┌─────────┐ │
//! │  │ stage 1 │────────▶│ stage 2 │────────▶│ stage 3 │ │
//! │  └─────────┘         └─────────┘         └─────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```

mod pipeline;

pub use pipeline::PipelineRunner;
