// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::constants::{ANNOTATION_DNS_TYPE, ANNOTATION_RECORDS_HASH};
    use crate::crd::Endpoint;
    use crate::gslb::endpoint::{a_record, assemble, host_records, records_hash};
    use crate::gslb::strategy::HostDecision;
    use crate::gslb::testing::{round_robin, strings, HOST, LOCAL_NAME};
    use crate::gslb::HealthStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn decision(local: Option<&[&str]>, global: &[&str]) -> HostDecision {
        HostDecision {
            host: HOST.to_string(),
            health: if local.is_some() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            local_record: local.map(strings),
            final_targets: strings(global),
            ambiguity: None,
        }
    }

    #[test]
    fn test_healthy_host_emits_local_then_global() {
        let records = host_records(&decision(Some(&["10.0.0.1"]), &["10.0.0.1", "10.1.0.1"]), 30);

        assert_eq!(
            records,
            vec![
                a_record(LOCAL_NAME, 30, strings(&["10.0.0.1"])),
                a_record(HOST, 30, strings(&["10.0.0.1", "10.1.0.1"])),
            ]
        );
        assert_eq!(records[0].record_type, "A");
    }

    #[test]
    fn test_empty_final_targets_suppress_global_record() {
        let records = host_records(&decision(None, &[]), 30);
        assert!(records.is_empty());
    }

    #[test]
    fn test_healthy_host_with_no_local_targets_still_emits_local_record() {
        let records = host_records(&decision(Some(&[]), &["10.1.0.1"]), 30);

        assert_eq!(records[0], a_record(LOCAL_NAME, 30, Vec::new()));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_assemble_sets_identity_and_annotations() {
        let mut service = round_robin();
        service.owner = Some(OwnerReference {
            api_version: "gslb.firestoned.io/v1alpha1".to_string(),
            kind: "Gslb".to_string(),
            name: "app".to_string(),
            uid: "1234".to_string(),
            controller: Some(true),
            ..Default::default()
        });

        let endpoint = assemble(&service, &[decision(Some(&["10.0.0.1"]), &["10.0.0.1"])]);

        assert_eq!(endpoint.metadata.name.as_deref(), Some("app"));
        assert_eq!(endpoint.metadata.namespace.as_deref(), Some("default"));
        let annotations = endpoint.metadata.annotations.clone().unwrap_or_default();
        assert_eq!(annotations.get(ANNOTATION_DNS_TYPE).map(String::as_str), Some("local"));
        assert_eq!(
            annotations.get(ANNOTATION_RECORDS_HASH),
            Some(&records_hash(&endpoint.spec.endpoints))
        );
        let owners = endpoint.metadata.owner_references.unwrap_or_default();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "1234");
    }

    #[test]
    fn test_assemble_without_owner() {
        let endpoint = assemble(&round_robin(), &[]);

        assert!(endpoint.metadata.owner_references.is_none());
        assert!(endpoint.spec.endpoints.is_empty());
    }

    #[test]
    fn test_ttl_comes_from_service() {
        let mut service = round_robin();
        service.record_ttl = 5;

        let endpoint = assemble(&service, &[decision(Some(&["10.0.0.1"]), &["10.0.0.1"])]);

        assert!(endpoint.spec.endpoints.iter().all(|e| e.record_ttl == 5));
    }

    #[test]
    fn test_records_hash_tracks_content() {
        let a = vec![a_record(HOST, 30, strings(&["10.0.0.1"]))];
        let b = vec![a_record(HOST, 30, strings(&["10.0.0.2"]))];

        assert_eq!(records_hash(&a), records_hash(&a.clone()));
        assert_ne!(records_hash(&a), records_hash(&b));
        assert_eq!(records_hash(&a).len(), 64);
    }

    #[test]
    fn test_records_serialize_with_external_dns_field_names() {
        let record: Endpoint = a_record(HOST, 30, strings(&["10.0.0.1"]));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["dnsName"], HOST);
        assert_eq!(json["recordTTL"], 30);
        assert_eq!(json["recordType"], "A");
    }
}
