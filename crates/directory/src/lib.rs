//! Client directory: identity records keyed by a unique document ID.
//!
//! Data stored in DashMap (development); swap to PostgreSQL for production.

pub mod directory;

pub use directory::{ClientDirectory, RegisterClientRequest, UpdateClientRequest};
