//! Links separately compiled units and a main program into one executable program image.
//!
//! [resolve_order] sorts the units so each comes after the units it uses, and [link()] lays them
//! out one after the other, turning unit-local slots, labels and symbolic calls into absolute
//! global slots and code addresses.

mod alloc;
pub mod dep_sort;
mod error;
pub mod link;
mod options;
mod program;

pub use self::dep_sort::resolve_order;
pub use self::error::*;
pub use self::link::link;
pub use self::options::*;
pub use self::program::*;
