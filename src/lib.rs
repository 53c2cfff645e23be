//! Reference data cache for the tax portal.
//!
//! Reference and configuration data lives in the back office and is slow and
//! occasionally unavailable. This crate caches it per kind as a map from
//! `(domain, service, workplace)` keys to records, populating a kind wholesale
//! on first use and refreshing it on demand or on a schedule.

pub mod back_office;
pub mod cache;
pub mod config;
pub mod error;
pub mod reference;
pub mod reference_data;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use error::{RefDataError, Result};
pub use reference_data::ReferenceData;
