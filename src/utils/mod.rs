//! Commonly used utilities like handles and hash maps.

#[macro_use]
pub mod handle;
pub mod data_vec;
pub mod hash;
pub mod hash_value;

pub mod prelude {
    pub use super::data_vec::DataVec;
    pub use super::handle::{Handle, HandleIndex};
    pub use super::hash::{FastHashMap, FastHashSet};
    pub use super::hash_value::HashValue;
}
