// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `config.rs`

#[cfg(test)]
mod tests {
    use crate::config::*;
    use crate::dns::ResolverSelector;
    use crate::dns_errors::GslbError;
    use clap::Parser;
    use std::time::Duration;

    fn base_args() -> Vec<&'static str> {
        vec![
            "gslb",
            "--cluster-geo-tag",
            "eu",
            "--ext-clusters-geo-tags",
            "us,za",
            "--dns-zone",
            "Cloud.Example.com.",
            "--edge-dns-zone",
            "example.com",
            "--edge-dns-server",
            "10.0.0.53",
        ]
    }

    fn parse(extra: &[&'static str]) -> OperatorConfig {
        let mut args = base_args();
        args.extend_from_slice(extra);
        OperatorConfig::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_topology_from_flags() {
        let topology = parse(&[]).topology().unwrap();

        assert_eq!(topology.geo_tag, "eu");
        assert_eq!(topology.dns_zone, "cloud.example.com");
        assert_eq!(topology.edge_dns_zone, "example.com");
        assert_eq!(topology.edge_dns_server, "10.0.0.53");
        assert_eq!(topology.peer_geo_tags, vec!["us", "za"]);
        assert_eq!(topology.resolver, ResolverSelector::Direct);
        assert_eq!(topology.query_timeout, Duration::from_millis(2000));
        assert!(!topology.split_brain_check);
        assert_eq!(topology.edge_resolver(), "10.0.0.53:53");
    }

    #[test]
    fn test_fake_dns_overrides_resolver() {
        let topology = parse(&["--fake-dns-enabled"]).topology().unwrap();

        assert_eq!(topology.edge_resolver(), "127.0.0.1:7753");
    }

    #[test]
    fn test_peer_order_is_preserved() {
        let mut config = parse(&[]);
        config.ext_clusters_geo_tags = vec!["za".into(), " ".into(), "us".into()];

        let topology = config.topology().unwrap();
        assert_eq!(topology.peer_geo_tags, vec!["za", "us"]);
    }

    #[test]
    fn test_no_peers_is_valid() {
        let mut config = parse(&[]);
        config.ext_clusters_geo_tags = vec![String::new()];

        assert!(config.topology().unwrap().peer_geo_tags.is_empty());
    }

    #[test]
    fn test_self_as_peer_rejected() {
        let mut config = parse(&[]);
        config.ext_clusters_geo_tags = vec!["us".into(), "eu".into()];

        assert_eq!(
            config.topology().unwrap_err(),
            ConfigError::SelfAsPeer("eu".to_string())
        );
    }

    #[test]
    fn test_invalid_geo_tag_rejected() {
        let mut config = parse(&[]);
        config.cluster_geo_tag = "eu.west".to_string();

        assert_eq!(
            config.topology().unwrap_err(),
            ConfigError::InvalidGeoTag("eu.west".to_string())
        );
    }

    #[test]
    fn test_zone_must_be_below_edge_zone() {
        let mut config = parse(&[]);
        config.dns_zone = "cloud.other.org".to_string();

        assert!(matches!(
            config.topology().unwrap_err(),
            ConfigError::ZoneNotDelegated { .. }
        ));
    }

    #[test]
    fn test_missing_edge_server_rejected() {
        let mut config = parse(&[]);
        config.edge_dns_server = "  ".to_string();

        assert_eq!(
            config.topology().unwrap_err(),
            ConfigError::Missing("EDGE_DNS_SERVER")
        );
    }

    #[test]
    fn test_edge_dns_type_parsing() {
        assert_eq!("route53".parse::<EdgeDnsType>().unwrap(), EdgeDnsType::Route53);
        assert_eq!("NS1".parse::<EdgeDnsType>().unwrap(), EdgeDnsType::Ns1);
        assert_eq!("infoblox".parse::<EdgeDnsType>().unwrap(), EdgeDnsType::Infoblox);
        assert_eq!("none".parse::<EdgeDnsType>().unwrap(), EdgeDnsType::None);
        assert_eq!(EdgeDnsType::Ns1.to_string(), "ns1");
    }

    #[test]
    fn test_unknown_edge_dns_type_is_an_error() {
        let config = parse(&["--edge-dns-type", "powerdns"]);

        assert!(matches!(
            config.edge_dns_type(),
            Err(GslbError::UnknownEdgeDnsType(t)) if t == "powerdns"
        ));
    }

    #[test]
    fn test_infoblox_requires_grid_host() {
        let config = parse(&["--edge-dns-type", "infoblox"]);
        assert_eq!(
            config.infoblox().unwrap_err(),
            ConfigError::MissingInfobloxGrid
        );

        let config = parse(&["--infoblox-grid-host", "grid.example.com"]);
        let settings = config.infoblox().unwrap();
        assert_eq!(settings.grid_host, "grid.example.com");
        assert_eq!(settings.port, 443);
        assert_eq!(settings.version, "2.3.1");
    }

    #[test]
    fn test_normalize_zone() {
        assert_eq!(normalize_zone(" Example.COM. "), "example.com");
    }
}
