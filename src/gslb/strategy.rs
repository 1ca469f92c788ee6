// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Strategy engine: combine local and peer targets into the published answer.
//!
//! A pure function of its inputs; all DNS I/O happened before it is called.
//!
//! | Strategy | This cluster | Local health | Global targets |
//! |---|---|---|---|
//! | round robin | any | healthy | local ++ external |
//! | round robin | any | unhealthy | external |
//! | failover | primary | healthy | local |
//! | failover | primary | unhealthy | external |
//! | failover | secondary | any | external, or local if none were found and healthy |
//!
//! The last row carries an ambiguity: no answer from the primary means either "primary
//! down" or "primary unreachable". The primary's heartbeat is passed in so a decision
//! made without confirmation is flagged with a [`FailoverAmbiguity`]. Under
//! [`SplitBrainPolicy::Enforced`] such a secondary does not take over and publishes no
//! global record; `localtargets-<host>` is still published.

use super::heartbeat::{Freshness, PeerFreshness};
use super::peers::{external_targets, PeerState, PeerTargets};
use super::{GlobalService, HealthStatus};
use crate::crd::StrategyType;
use std::fmt;

/// Why a secondary could not confirm that the primary is really down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailoverAmbiguity {
    /// The primary is not among the configured peers
    PrimaryNotAPeer { primary: String },
    /// The primary's name server did not answer
    PrimaryUnreachable { primary: String },
    /// The primary's heartbeat is gone or too old
    PrimaryStale { primary: String, reason: String },
    /// The primary's heartbeat was not consulted
    PrimaryUnchecked { primary: String },
}

impl fmt::Display for FailoverAmbiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimaryNotAPeer { primary } => {
                write!(f, "primary {primary} is not a configured peer cluster")
            }
            Self::PrimaryUnreachable { primary } => {
                write!(f, "primary {primary} name server is unreachable")
            }
            Self::PrimaryStale { primary, reason } => {
                write!(f, "primary {primary} heartbeat is stale: {reason}")
            }
            Self::PrimaryUnchecked { primary } => {
                write!(f, "primary {primary} heartbeat was not checked")
            }
        }
    }
}

/// What a failover secondary does when it cannot confirm that the primary is down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitBrainPolicy {
    /// Take over with local targets and flag the ambiguity
    #[default]
    Advisory,
    /// Publish no global record until the primary is confirmed down
    Enforced,
}

impl SplitBrainPolicy {
    #[must_use]
    pub fn from_check(split_brain_check: bool) -> Self {
        if split_brain_check {
            Self::Enforced
        } else {
            Self::Advisory
        }
    }
}

/// Everything the engine knows about one host.
#[derive(Clone, Copy, Debug)]
pub struct HostInput<'a> {
    pub host: &'a str,
    pub health: HealthStatus,
    pub local_targets: &'a [String],
    pub peers: &'a [PeerTargets],
    pub freshness: &'a PeerFreshness,
}

/// Records to publish for one host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostDecision {
    pub host: String,
    pub health: HealthStatus,
    /// Targets of `localtargets-<host>`; present only while the host is healthy
    pub local_record: Option<Vec<String>>,
    /// Targets of the global record; empty means the record is not published
    pub final_targets: Vec<String>,
    pub ambiguity: Option<FailoverAmbiguity>,
}

/// Decide the records published for one host.
#[must_use]
pub fn decide(
    input: &HostInput<'_>,
    service: &GlobalService,
    cluster_geo_tag: &str,
    policy: SplitBrainPolicy,
) -> HostDecision {
    let healthy = input.health == HealthStatus::Healthy;
    let local: Vec<String> = if healthy {
        input.local_targets.to_vec()
    } else {
        Vec::new()
    };
    let external = external_targets(input.peers);

    let mut ambiguity = None;
    let final_targets = match service.strategy {
        StrategyType::RoundRobin => {
            let mut targets = local.clone();
            targets.extend(external);
            targets
        }
        StrategyType::Failover => match service.primary_peer(cluster_geo_tag) {
            None if healthy => local.clone(),
            None => external,
            Some(primary) => {
                if external.is_empty() {
                    ambiguity = unconfirmed_primary(primary, input.peers, input.freshness);
                    match (&ambiguity, policy) {
                        (Some(_), SplitBrainPolicy::Enforced) => Vec::new(),
                        _ => local.clone(),
                    }
                } else {
                    external
                }
            }
        },
    };

    HostDecision {
        host: input.host.to_string(),
        health: input.health,
        local_record: healthy.then_some(local),
        final_targets,
        ambiguity,
    }
}

/// A primary counts as confirmed down only if its name server answered with no
/// targets and its heartbeat is fresh.
fn unconfirmed_primary(
    primary: &str,
    peers: &[PeerTargets],
    freshness: &PeerFreshness,
) -> Option<FailoverAmbiguity> {
    let primary = primary.to_string();
    let Some(peer) = peers.iter().find(|p| p.geo_tag == primary) else {
        return Some(FailoverAmbiguity::PrimaryNotAPeer { primary });
    };

    match (&peer.state, freshness.get(&primary)) {
        (_, Some(Freshness::Stale(e))) => Some(FailoverAmbiguity::PrimaryStale {
            primary,
            reason: e.to_string(),
        }),
        (PeerState::Unreachable(_), _) => Some(FailoverAmbiguity::PrimaryUnreachable { primary }),
        (_, Some(Freshness::Fresh)) => None,
        _ => Some(FailoverAmbiguity::PrimaryUnchecked { primary }),
    }
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod strategy_tests;
