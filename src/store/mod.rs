//! Durable fingerprint persistence.

mod csv_store;

pub use csv_store::FingerprintStore;
