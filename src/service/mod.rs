//! Service layer: the persistence adapter wiring the brain to the store.

pub mod adapter;

pub use adapter::BrainPersistenceAdapter;
