pub mod foreign;
mod function;
mod lazy;
mod list;
mod module;
mod record;
mod values;
mod variant;

pub use foreign::{Dispatcher, ForeignValue};
pub use function::{Application, Body, Clause, Function, NativeFn, OverloadTable};
pub use lazy::{Begin, Deferred, Poll, Thunk};
pub use list::{Cons, List};
pub use module::Module;
pub use record::Record;
pub use values::{TypeId, TypeInfo, TypeTag, Value};
pub use variant::Variant;

#[cfg(test)]
mod record_test;
