// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use crate::constants::ANNOTATION_RECORDS_HASH;
    use crate::crd::{DNSEndpoint, DNSEndpointSpec};
    use crate::reconcilers::resources::{plan_write, WriteOutcome};
    use std::collections::BTreeMap;

    fn endpoint(hash: Option<&str>) -> DNSEndpoint {
        let mut endpoint = DNSEndpoint::new("app", DNSEndpointSpec::default());
        endpoint.metadata.annotations = hash.map(|h| {
            BTreeMap::from([(ANNOTATION_RECORDS_HASH.to_string(), h.to_string())])
        });
        endpoint
    }

    #[test]
    fn test_missing_object_is_created() {
        assert_eq!(plan_write(None, &endpoint(Some("abc"))), WriteOutcome::Created);
    }

    #[test]
    fn test_same_hash_is_unchanged() {
        let existing = endpoint(Some("abc"));
        assert_eq!(
            plan_write(Some(&existing), &endpoint(Some("abc"))),
            WriteOutcome::Unchanged
        );
    }

    #[test]
    fn test_different_hash_is_replaced() {
        let existing = endpoint(Some("abc"));
        assert_eq!(
            plan_write(Some(&existing), &endpoint(Some("def"))),
            WriteOutcome::Replaced
        );
    }

    #[test]
    fn test_missing_or_empty_hash_is_replaced() {
        let unannotated = endpoint(None);
        let empty = endpoint(Some(""));

        assert_eq!(
            plan_write(Some(&unannotated), &endpoint(Some("abc"))),
            WriteOutcome::Replaced
        );
        assert_eq!(plan_write(Some(&empty), &endpoint(Some(""))), WriteOutcome::Replaced);
        assert_eq!(plan_write(Some(&unannotated), &endpoint(None)), WriteOutcome::Replaced);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(WriteOutcome::Created.to_string(), "created");
        assert_eq!(WriteOutcome::Replaced.as_str(), "replaced");
        assert_eq!(WriteOutcome::Unchanged.as_str(), "unchanged");
    }
}
