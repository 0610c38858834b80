#![doc = include_str!("../README.md")]

pub mod platform;
pub mod umami;

#[cfg(test)]
pub mod test_support;
