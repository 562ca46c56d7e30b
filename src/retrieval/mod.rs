pub mod astra;

pub use astra::AstraDb;
