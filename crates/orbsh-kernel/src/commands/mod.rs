//! Command system for orbsh.
//!
//! Every command is a [`CommandSpec`]: a name, typed parameters, and a
//! [`CommandHandler`]. Modules group specs into command sets and hand them
//! to the registry in one [`ModuleDescriptor`].
//!
//! # Architecture
//!
//! ```text
//! CommandRegistry
//! ├── core module (help, echo, get, set, vars, ...)
//! └── user modules (registered through Shell::register_module)
//! ```

mod builtin;
mod context;
mod traits;

pub use builtin::{core_module, CORE_MODULE};
pub use context::{ExecContext, OutputSink, PipelinePosition};
pub use traits::{
    handler_fn, CommandError, CommandHandler, CommandSet, CommandSpec, DeclaringId, FnHandler,
    ModuleDescriptor,
};
