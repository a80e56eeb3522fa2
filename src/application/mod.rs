pub mod builder;
pub mod credentials;
pub mod errors;
pub mod lfs;
pub mod migration;
pub mod mirror;
pub mod ports;
pub mod tags;

#[cfg(test)]
pub mod test_utils;
