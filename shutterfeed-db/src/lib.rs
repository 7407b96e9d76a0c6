pub mod client;
pub mod config;
pub mod memory;
pub mod record;
pub mod remote;
pub mod save;
pub mod store;

#[cfg(test)]
mod test_support;
