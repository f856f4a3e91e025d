//! Reentrancy-safe collections.
//!
//! Every structure here allocates through [`std::alloc::System`] directly. The profiler
//! keeps all of its own bookkeeping in these types so that growing a registry or the
//! scope stack is never observed (or recursed into) by a profiling allocator.

pub mod map;
pub mod stack;
pub mod string;
pub mod vec;

pub use map::{RawMap, DEFAULT_BUCKETS};
pub use stack::{EmptyStack, RawStack};
pub use string::RawString;
pub use vec::RawVec;
