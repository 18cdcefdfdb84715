//! Assessment driver: probe, classify, detect staleness, aggregate.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use replcheck_common::{
    DegradationSet, EndpointRecord, Fetcher, ProbeError, RepositoryAssessment, Role, urls,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::alias::AliasTable;
use crate::classifier::{self, DeclaredTopology, classify_role};
use crate::clock::{Clock, Sleeper, SystemClock};
use crate::prober;
use crate::staleness::{self, STALENESS_WINDOW_SECS};
use crate::wait::{self, WaitOutcome};

/// Errors that abort an assessment.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("'{0}' is not a valid repository URL")]
    InvalidUrl(String),

    #[error("cannot assess {url}: {source}")]
    Primary {
        url: String,
        #[source]
        source: ProbeError,
    },
}

/// Runs assessments for one repository at a time.
#[derive(Debug, Clone)]
pub struct Auditor<F, C = SystemClock> {
    fetcher: F,
    clock: C,
    aliases: AliasTable,
    staleness_window_secs: u64,
}

impl<F: Fetcher> Auditor<F, SystemClock> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            clock: SystemClock,
            aliases: AliasTable::default(),
            staleness_window_secs: STALENESS_WINDOW_SECS,
        }
    }
}

impl<F: Fetcher, C: Clock> Auditor<F, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Auditor<F, C2> {
        Auditor {
            fetcher: self.fetcher,
            clock,
            aliases: self.aliases,
            staleness_window_secs: self.staleness_window_secs,
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_staleness_window(mut self, secs: u64) -> Self {
        self.staleness_window_secs = secs;
        self
    }

    /// Assess the repository whose primary target is `primary_url`.
    ///
    /// The primary target's metainfo declares the rest of the endpoint
    /// set. An unreachable endpoint, primary included, is recorded as
    /// `down`. A malformed manifest or whitelist or corrupt metainfo on
    /// the primary aborts the assessment; on any other endpoint it only
    /// takes that endpoint down.
    pub fn assess(&self, primary_url: &str) -> Result<RepositoryAssessment, AuditError> {
        let now = self.clock.now();
        let primary_url = urls::normalize(primary_url).to_string();
        let primary_host =
            urls::host_of(&primary_url).ok_or_else(|| AuditError::InvalidUrl(primary_url.clone()))?;
        info!(url = %primary_url, "assessing repository");

        let mut endpoints = Vec::new();
        let mut repository_degradations = DegradationSet::new();

        let topology = match prober::probe(&self.fetcher, &primary_url) {
            Ok(raw) => {
                let classification =
                    classifier::classify(&self.fetcher, raw, None, &self.aliases, now).map_err(
                        |source| AuditError::Primary {
                            url: primary_url.clone(),
                            source,
                        },
                    )?;
                repository_degradations.merge(classification.repository_degradations);
                endpoints.push(classification.record);
                classification.topology
            }
            Err(e) if e.is_unreachable() => {
                warn!(url = %primary_url, error = %e, "primary target unreachable");
                endpoints.push(EndpointRecord::down(
                    primary_url.as_str(),
                    primary_host.as_str(),
                    self.aliases.resolve(&primary_host),
                    Role::Unknown,
                    e.to_string(),
                ));
                DeclaredTopology::default()
            }
            Err(source) => {
                return Err(AuditError::Primary {
                    url: primary_url,
                    source,
                });
            }
        };

        // host -> index into `endpoints`
        let mut seen_hosts = HashMap::from([(primary_host, 0)]);
        for declared in topology.endpoints() {
            let Some(host) = urls::host_of(declared) else {
                warn!(url = declared, "declared endpoint is not a valid URL");
                repository_degradations.insert(format!("declared endpoint {declared} is not a valid URL"));
                continue;
            };
            if let Some(&index) = seen_hosts.get(&host) {
                debug!(url = declared, "host already assessed");
                classifier::adopt_declared_role(
                    &self.fetcher,
                    &mut endpoints[index],
                    classify_role(declared, &topology),
                );
                continue;
            }
            seen_hosts.insert(host.clone(), endpoints.len());
            let (record, degradations) = self.assess_secondary(declared, host, &topology, now);
            repository_degradations.merge(degradations);
            endpoints.push(record);
        }

        let stale = staleness::detect_staleness(&mut endpoints, now, self.staleness_window_secs);
        let num_up = aggregate::count_up(&endpoints);
        let verdict = aggregate::aggregate(&endpoints, &repository_degradations, stale);
        info!(
            url = %primary_url,
            endpoints = endpoints.len(),
            num_up,
            verdict = %verdict,
            "assessment complete"
        );

        Ok(RepositoryAssessment {
            repository: endpoints.first().and_then(|e| e.repository.clone()),
            primary_url,
            endpoints,
            repository_degradations,
            stale,
            num_up,
            verdict,
            assessed_at: now,
        })
    }

    /// Assess repeatedly until every reachable endpoint serves `target`.
    pub fn wait_for_revision<S: Sleeper>(
        &self,
        primary_url: &str,
        target: Option<u64>,
        interval: Duration,
        sleeper: &S,
    ) -> Result<WaitOutcome, AuditError> {
        wait::wait_for_revision(self, primary_url, target, interval, sleeper)
    }

    fn assess_secondary(
        &self,
        url: &str,
        host: String,
        topology: &DeclaredTopology,
        now: DateTime<Utc>,
    ) -> (EndpointRecord, DegradationSet) {
        let result = prober::probe(&self.fetcher, url).and_then(|raw| {
            classifier::classify(&self.fetcher, raw, Some(topology), &self.aliases, now)
        });
        match result {
            Ok(classification) => (classification.record, classification.repository_degradations),
            Err(e) => {
                warn!(url, error = %e, "endpoint down");
                let alias = self.aliases.resolve(&host);
                let record = EndpointRecord::down(
                    urls::normalize(url),
                    host,
                    alias,
                    classify_role(url, topology),
                    e.to_string(),
                );
                (record, DegradationSet::new())
            }
        }
    }
}
