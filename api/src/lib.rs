pub mod api;
pub mod config;
pub mod global;
pub mod license;
pub mod log_entry;
pub mod promotion;

#[cfg(test)]
mod tests;
