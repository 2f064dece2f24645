//! Execution context, runtime errors and the driving loop.

mod context;
mod error;
mod machine;
mod program;

pub use context::{ExecContext, ForceMode, Interrupt, Outcome};
pub use error::{ErrorKind, RuntimeError};
pub use machine::Machine;
pub use program::{Chunk, Instr, Literal, Program};

#[cfg(test)]
mod machine_test;
