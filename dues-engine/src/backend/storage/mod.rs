//! # Storage Module
//!
//! Access to mess data. The domain layer depends only on the
//! [`MessDataSource`] trait; [`HttpMessDataSource`](crate::backend::io::HttpMessDataSource)
//! is the production implementation and [`InMemoryMessSource`] serves
//! previews and tests.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemoryMessSource;
pub use traits::MessDataSource;
