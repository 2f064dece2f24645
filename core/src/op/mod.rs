//! Operation dispatch: operator definitions, the numeric tower and the
//! per-kind implementations behind the methods on [`crate::val::Value`].

pub(crate) mod compare;
pub(crate) mod convert;
pub(crate) mod index;
pub mod numeric;
mod ops;
pub(crate) mod show;

pub use numeric::{NumericClass, NumericTower};
pub use ops::{BinOp, UnaryOp};
pub use show::{FormatOptions, Notation, Radix};

#[cfg(test)]
mod numeric_test;
#[cfg(test)]
mod op_test;
