pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{AzureClient, CicdApi};
pub use types::*;
