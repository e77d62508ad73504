//! Reusable fixtures for the integration suites

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod memory_provider;
pub mod memory_queue;
pub mod test_data;

pub use memory_provider::MemoryProvider;
pub use memory_queue::MemoryQueue;
pub use test_data::*;
