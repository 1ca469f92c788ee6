// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the GSLB controller.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `Gslb` CRD
pub const API_GROUP: &str = "gslb.firestoned.io";

/// API version for the `Gslb` CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "gslb.firestoned.io/v1alpha1";

/// Kind name for `Gslb` resource
pub const KIND_GSLB: &str = "Gslb";

/// Kind name for the external-dns `DNSEndpoint` resource
pub const KIND_DNS_ENDPOINT: &str = "DNSEndpoint";

/// Field manager used for server-side apply and status patches
pub const FIELD_MANAGER: &str = "gslb-controller";

// ============================================================================
// Annotation Constants
// ============================================================================

/// Annotation telling external-dns which `DNSEndpoint` objects belong to which pipeline
pub const ANNOTATION_DNS_TYPE: &str = "gslb.firestoned.io/dnstype";

/// `dnstype` value for records served by the in-cluster `CoreDNS`
pub const DNS_TYPE_LOCAL: &str = "local";

/// `dnstype` value for delegation records pushed to the edge by external-dns
pub const DNS_TYPE_EXTDNS: &str = "extdns";

/// Annotation carrying the SHA-256 of the desired record list
pub const ANNOTATION_RECORDS_HASH: &str = "gslb.firestoned.io/records-hash";

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries
pub const DNS_PORT: u16 = 53;

/// Resolver every query is redirected to when fake DNS is enabled
pub const FAKE_DNS_RESOLVER: &str = "127.0.0.1:7753";

/// Default per-query timeout for outbound DNS queries (milliseconds)
pub const DEFAULT_DNS_QUERY_TIMEOUT_MS: u64 = 2000;

/// Default TTL for published records (seconds)
pub const DEFAULT_DNS_TTL_SECS: i64 = 30;

/// Default maximum heartbeat age before a peer is considered stale (seconds)
pub const DEFAULT_SPLIT_BRAIN_THRESHOLD_SECS: i64 = 300;

/// Record type of every published target record
pub const RECORD_TYPE_A: &str = "A";

/// Record type of delegation records
pub const RECORD_TYPE_NS: &str = "NS";

/// Record type of heartbeat records
pub const RECORD_TYPE_TXT: &str = "TXT";

/// Prefix of the cluster-local record peers query for our targets
pub const LOCAL_TARGETS_PREFIX: &str = "localtargets-";

/// Prefix of every cluster's delegated name server
pub const NS_SERVER_PREFIX: &str = "gslb-ns";

/// Timestamp layout carried by heartbeat TXT records (UTC, no offset)
pub const HEARTBEAT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Service exposing this cluster's `CoreDNS` to the edge
pub const COREDNS_SERVICE_NAME: &str = "gslb-coredns-lb";

// ============================================================================
// Health Constants
// ============================================================================

/// Health value for a host whose backing service has ready endpoints
pub const HEALTH_HEALTHY: &str = "Healthy";

/// Health value for a host without ready endpoints
pub const HEALTH_UNHEALTHY: &str = "Unhealthy";

// ============================================================================
// Controller Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Default periodic requeue; peer state changes are not watchable
pub const DEFAULT_RECONCILE_REQUEUE_SECS: u64 = 30;

/// Upper bound for a single reconcile, DNS queries included
pub const RECONCILE_TIMEOUT_SECS: u64 = 60;

/// Default namespace the controller runs in
pub const DEFAULT_POD_NAMESPACE: &str = "gslb-system";

// ============================================================================
// Infoblox Constants
// ============================================================================

/// Default Infoblox WAPI port
pub const DEFAULT_INFOBLOX_WAPI_PORT: u16 = 443;

/// Default Infoblox WAPI version
pub const DEFAULT_INFOBLOX_WAPI_VERSION: &str = "2.3.1";

/// HTTP timeout for WAPI calls (seconds)
pub const INFOBLOX_HTTP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 8080;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";
