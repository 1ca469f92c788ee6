// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs`

#[cfg(test)]
mod tests {
    use super::super::{gslb_for_ingress, metrics_router};
    use gslb::constants::METRICS_SERVER_PATH;
    use gslb::metrics;
    use k8s_openapi::api::networking::v1::Ingress;
    use kube::api::ObjectMeta;
    use std::time::Duration as StdDuration;
    use tokio::time::timeout;

    #[test]
    fn test_ingress_maps_to_same_named_gslb() {
        let ingress = Ingress {
            metadata: ObjectMeta {
                name: Some("app".to_string()),
                namespace: Some("apps".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let gslb = gslb_for_ingress(&ingress).unwrap();

        assert_eq!(gslb.name, "app");
        assert_eq!(gslb.namespace.as_deref(), Some("apps"));
    }

    #[test]
    fn test_cluster_scoped_ingress_is_ignored() {
        let ingress = Ingress {
            metadata: ObjectMeta {
                name: Some("app".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(gslb_for_ingress(&ingress).is_none());
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_registry() {
        metrics::record_peer_query_failure("us");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move { axum::serve(listener, metrics_router()).await });

        let response = timeout(
            StdDuration::from_secs(5),
            reqwest::get(format!("http://{addr}{METRICS_SERVER_PATH}")),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(response.status().is_success());
        let body = response.text().await.unwrap();
        assert!(body.contains("gslb_firestoned_io_peer_query_failures_total"));

        server.abort();
    }

    /// The ctrl-c future stays pending while no signal is delivered
    #[tokio::test]
    async fn test_sigint_handler_exists() {
        let result = timeout(StdDuration::from_millis(100), tokio::signal::ctrl_c()).await;
        assert!(result.is_err());
    }
}
