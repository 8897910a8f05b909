//! Partition writers: raw provider payloads and curated CSV partitions.

pub mod curated;
pub mod raw;

pub use curated::CuratedPartitionWriter;
pub use raw::RawPartitions;
