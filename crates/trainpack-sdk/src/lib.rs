//! Stage-author API for trainpack.
//!
//! A training project registers its stage functions in a [`Registry`]
//! under a module path, and the engine invokes them in pipeline order.
//! Each invocation receives a [`StageIo`] whose writers tee everything
//! the stage prints to the remote log channel.

pub mod io;
pub mod registry;

pub use io::{LogLevel, LogRecord, LogSink, MemoryLogSink, StageIo, TeeWriter};
pub use registry::{Registry, StageFn, StageResult};
