pub mod config;
pub mod game;
pub mod model;
pub mod traits;
pub mod util;

#[cfg(test)]
mod test_utils;
