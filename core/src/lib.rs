//! Runtime core of the Fen language: tagged values, per-kind operation
//! dispatch, the execution context error model, lazy thunks and the
//! cooperative driving loop.

pub mod config;
pub mod op;
pub mod rt;
pub mod util;
pub mod val;

pub use config::RuntimeConfig;
pub use op::{BinOp, FormatOptions, UnaryOp};
pub use rt::{Chunk, ErrorKind, ExecContext, ForceMode, Instr, Interrupt, Literal, Machine, Outcome, Program, RuntimeError};
pub use val::{Function, List, Record, Thunk, TypeTag, Value, Variant};
