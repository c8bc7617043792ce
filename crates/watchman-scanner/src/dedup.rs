//! Structural deduplication of results from independent workers.

use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

/// Drop items whose canonical JSON form was already seen.
///
/// The first occurrence wins and the relative order of survivors is kept, so
/// applying this twice gives the same output as applying it once. Items that
/// cannot be serialized are kept.
pub fn deduplicate<T: Serialize>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| match serde_json::to_string(item) {
            Ok(canonical) => seen.insert(canonical),
            Err(e) => {
                warn!(error = %e, "result has no canonical form, keeping it");
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Hit {
        id: u32,
        text: &'static str,
    }

    fn hit(id: u32, text: &'static str) -> Hit {
        Hit { id, text }
    }

    #[test]
    fn test_drops_repeats_keeping_first_order() {
        let items = vec![hit(2, "b"), hit(1, "a"), hit(2, "b"), hit(3, "c"), hit(1, "a")];
        assert_eq!(
            deduplicate(items),
            vec![hit(2, "b"), hit(1, "a"), hit(3, "c")]
        );
    }

    #[test]
    fn test_idempotent() {
        let items = vec![hit(1, "a"), hit(1, "a"), hit(1, "b"), hit(2, "a")];
        let once = deduplicate(items);
        let twice = deduplicate(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty() {
        assert!(deduplicate(Vec::<Hit>::new()).is_empty());
    }
}
