pub mod access;
pub mod config;
pub mod error;
pub mod history;
pub mod network;
pub mod scanner;
pub mod web;

#[cfg(test)]
mod test_utils;
