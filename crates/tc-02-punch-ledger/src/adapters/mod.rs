//! Record store adapters.

pub mod flat_file;
pub mod memory;

pub use flat_file::FlatFileRecordStore;
pub use memory::InMemoryRecordStore;
