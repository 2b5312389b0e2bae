//! Stable cross-run identity for datasets.

/// Build the key identifying a dataset across runs.
///
/// The key is `"{doc_identifier}/{dataset_identifier}"`, with no
/// normalisation of either part.
///
/// # Panics
///
/// Panics if either identifier is empty. The parser rejects an empty
/// document identifier and the reconciler rejects empty dataset
/// identifiers before building a key, so reaching this is a bug.
///
/// # Examples
/// ```
/// use inventory_harvester::key::build_key;
///
/// assert_eq!(build_key("http://example.gov/", "payments"), "http://example.gov//payments");
/// ```
pub fn build_key(doc_identifier: &str, dataset_identifier: &str) -> String {
    assert!(!doc_identifier.is_empty(), "document identifier must not be empty");
    assert!(
        !dataset_identifier.is_empty(),
        "dataset identifier must not be empty"
    );
    format!("{doc_identifier}/{dataset_identifier}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_build_key() {
        assert_eq!(build_key("urn:council", "spend"), "urn:council/spend");
        assert_eq!(
            build_key("http://example.gov/", "payments"),
            "http://example.gov//payments"
        );
    }

    #[test]
    #[should_panic(expected = "document identifier")]
    fn test_empty_document_identifier_panics() {
        build_key("", "payments");
    }

    #[test]
    #[should_panic(expected = "dataset identifier")]
    fn test_empty_dataset_identifier_panics() {
        build_key("urn:council", "");
    }

    proptest! {
        #[test]
        fn prop_key_is_deterministic(doc in ".+", dataset in ".+") {
            prop_assert_eq!(build_key(&doc, &dataset), build_key(&doc, &dataset));
        }

        #[test]
        fn prop_distinct_datasets_never_collide(
            doc in ".+",
            a in ".+",
            b in ".+",
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(build_key(&doc, &a), build_key(&doc, &b));
        }

        #[test]
        fn prop_key_starts_with_document_identifier(doc in ".+", dataset in ".+") {
            let key = build_key(&doc, &dataset);
            let prefix = format!("{doc}/");
            prop_assert!(key.starts_with(&prefix));
            prop_assert!(key.ends_with(&dataset));
        }
    }
}
