// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::dns::{MemoryQuerier, ResolverSelector};
    use crate::dns_errors::{GslbError, QueryError};
    use crate::gslb::local_targets::{coredns_exposed_ips, resolve_local_targets, IngressEndpoint};
    use crate::gslb::testing::{strings, topology, EDGE};
    use k8s_openapi::api::networking::v1::IngressLoadBalancerIngress;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ips_are_taken_verbatim() {
        let dns = MemoryQuerier::new();
        let entries = vec![IngressEndpoint::ip("10.0.0.1"), IngressEndpoint::ip("10.0.0.2")];

        let targets = resolve_local_targets(&entries, &topology(), &dns).await.unwrap();

        assert_eq!(targets, strings(&["10.0.0.1", "10.0.0.2"]));
        assert!(dns.queries().is_empty());
    }

    #[tokio::test]
    async fn test_hostnames_are_resolved_on_edge_server() {
        let dns = MemoryQuerier::new().with_a(
            EDGE,
            "lb-1234.elb.amazonaws.com",
            &["52.0.0.1", "52.0.0.2"],
        );
        let entries = vec![
            IngressEndpoint::ip("10.0.0.1"),
            IngressEndpoint::hostname("lb-1234.elb.amazonaws.com"),
        ];

        let targets = resolve_local_targets(&entries, &topology(), &dns).await.unwrap();

        assert_eq!(targets, strings(&["10.0.0.1", "52.0.0.1", "52.0.0.2"]));
        assert_eq!(
            dns.queries(),
            vec![(EDGE.to_string(), "lb-1234.elb.amazonaws.com".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fake_resolver_redirects_hostname_lookups() {
        let mut topology = topology();
        topology.resolver = ResolverSelector::fake();
        let dns = MemoryQuerier::new().with_a("127.0.0.1:7753", "lb.local", &["172.18.0.2"]);

        let targets = resolve_local_targets(&[IngressEndpoint::hostname("lb.local")], &topology, &dns)
            .await
            .unwrap();

        assert_eq!(targets, strings(&["172.18.0.2"]));
    }

    #[tokio::test]
    async fn test_unresolvable_hostname_aborts() {
        let dns = MemoryQuerier::new();
        let entries = vec![
            IngressEndpoint::ip("10.0.0.1"),
            IngressEndpoint::hostname("gone.example.net"),
        ];

        let err = resolve_local_targets(&entries, &topology(), &dns)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GslbError::LocalTargets {
                ref hostname,
                source: QueryError::NxDomain { .. },
                ..
            } if hostname == "gone.example.net"
        ));
    }

    #[tokio::test]
    async fn test_slow_hostname_lookup_times_out() {
        let dns = MemoryQuerier::new()
            .with_a(EDGE, "lb.example.net", &["52.0.0.1"])
            .with_delay(EDGE, Duration::from_secs(5));

        let err = resolve_local_targets(&[IngressEndpoint::hostname("lb.example.net")], &topology(), &dns)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GslbError::LocalTargets {
                source: QueryError::Timeout { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_status_yields_no_targets() {
        let dns = MemoryQuerier::new();

        let targets = resolve_local_targets(&[], &topology(), &dns).await.unwrap();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_from_ingress_status_entry() {
        let entry = IngressLoadBalancerIngress {
            hostname: Some("lb.example.net".to_string()),
            ..Default::default()
        };

        assert_eq!(
            IngressEndpoint::from(&entry),
            IngressEndpoint::hostname("lb.example.net")
        );
    }

    #[tokio::test]
    async fn test_coredns_exposed_ips_resolves_hostname() {
        let dns = MemoryQuerier::new().with_a(EDGE, "coredns-lb.elb.amazonaws.com", &["52.1.1.1"]);

        let ips = coredns_exposed_ips(
            "gslb-coredns-lb",
            &[IngressEndpoint::hostname("coredns-lb.elb.amazonaws.com")],
            &topology(),
            &dns,
        )
        .await
        .unwrap();

        assert_eq!(ips, strings(&["52.1.1.1"]));
    }

    #[tokio::test]
    async fn test_coredns_without_load_balancer_is_an_error() {
        let dns = MemoryQuerier::new();

        let err = coredns_exposed_ips("gslb-coredns-lb", &[], &topology(), &dns)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GslbError::NoCoreDnsIngress { ref service } if service == "gslb-coredns-lb"
        ));
    }
}
