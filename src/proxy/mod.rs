//! Proxy module for loading and rotating egress proxies
//!
//! This module provides functionality for:
//! - Parsing proxy lists (HOST:PORT, USER:PASS@HOST:PORT, etc.)
//! - Deterministic proxy assignment by item index
//! - Building pooled HTTP clients per egress route

pub mod egress;
pub mod models;
pub mod parser;

pub use egress::EgressPool;
pub use models::{Proxy, ProxyAuth, ProxyType};
pub use parser::ProxyParser;

/// Proxy for the item at `index`: `proxies[index % len]`, or `None` when the
/// list is empty.
pub fn assign(proxies: &[Proxy], index: usize) -> Option<&Proxy> {
    if proxies.is_empty() {
        None
    } else {
        proxies.get(index % proxies.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_rotates_by_index() {
        let proxies: Vec<_> = (1..=3)
            .map(|i| Proxy::new(format!("10.0.0.{}", i), 8080, ProxyType::Http))
            .collect();

        for index in 0..7 {
            assert_eq!(assign(&proxies, index), Some(&proxies[index % 3]));
        }
    }

    #[test]
    fn test_assign_empty_list() {
        assert!(assign(&[], 0).is_none());
        assert!(assign(&[], 42).is_none());
    }
}
