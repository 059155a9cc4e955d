mod error;
mod formatter;
mod function;
mod instruction;
mod ty;
mod unit;
mod val;

pub use error::*;
pub use formatter::*;
pub use function::*;
pub use instruction::*;
pub use ty::*;
pub use unit::*;
pub use val::*;
