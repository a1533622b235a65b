pub mod api;
pub mod blob;
pub mod config;
pub mod database;
pub mod global;
pub mod store;

#[cfg(test)]
mod tests;
