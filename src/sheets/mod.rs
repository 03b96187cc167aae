pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod parser;
pub mod transform;
pub mod types;

#[cfg(test)]
pub mod mock;

pub use cached_client::CachedSheetClient;
