use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nanoid::nanoid;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::fan_out;
use super::ChangeEndpoint;
use super::ChangeOutcome;
use super::ChangeStatus;
use super::ConcurrencySizing;
use super::NodeReport;
use super::PhaseResult;
use crate::Change;
use crate::ChangeDetails;
use crate::ChangeEnvironment;
use crate::ChangeError;
use crate::ChangeRequestState;
use crate::CommitMessage;
use crate::DiscoverResponse;
use crate::PrepareMessage;
use crate::PrepareResponse;
use crate::Result;
use crate::RollbackMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Commit,
    Rollback,
}

/// Drives changes through prepare and commit/rollback on a fixed node set.
///
/// A change commits only if every node accepted it and every node rendered
/// the same document. Anything else is rolled back on the nodes that
/// accepted.
pub struct ChangeCoordinator {
    endpoints: Vec<Arc<dyn ChangeEndpoint>>,
    sizing: ConcurrencySizing,
    request_timeout: Duration,
    environment: ChangeEnvironment,
}

impl ChangeCoordinator {
    pub fn new(
        endpoints: Vec<Arc<dyn ChangeEndpoint>>,
        sizing: ConcurrencySizing,
        request_timeout: Duration,
        environment: ChangeEnvironment,
    ) -> Self {
        Self {
            endpoints,
            sizing,
            request_timeout,
            environment,
        }
    }

    pub fn addresses(&self) -> Vec<String> {
        self.endpoints.iter().map(|endpoint| endpoint.address()).collect()
    }

    pub fn environment(&self) -> &ChangeEnvironment {
        &self.environment
    }

    /// One view per node, in node order. Fails if any node cannot answer.
    pub async fn discover(&self) -> Result<Vec<DiscoverResponse>> {
        let all = self.all_nodes();
        self.fan_out(&all, |endpoint| async move { endpoint.discover().await })
            .await
            .into_iter()
            .collect()
    }

    /// Runs `change` through both protocol phases.
    ///
    /// Changes left prepared by an earlier run are resolved first. Returns an
    /// error only when the change could not be started; a refused change is
    /// reported through [`ChangeOutcome::status`].
    #[instrument(skip(self, change), fields(change = %change))]
    pub async fn run_change(
        &self,
        change: Change,
    ) -> Result<ChangeOutcome> {
        let mut views = self.discover().await?;
        if views.iter().any(|view| view.prepared_change().is_some()) {
            warn!("found changes left prepared by an earlier run, recovering first");
            self.recover_from(&views).await;
            views = self.discover().await?;
            if let Some((i, details)) = views
                .iter()
                .enumerate()
                .find_map(|(i, view)| view.prepared_change().map(|details| (i, details)))
            {
                return Err(ChangeError::InconsistentCluster(format!(
                    "{} still has change {} prepared",
                    self.endpoints[i].address(),
                    details.change_id
                ))
                .into());
            }
        }
        self.check_consistency(&views)?;

        let version = views.iter().map(|view| view.state.highest_version).max().unwrap_or(0) + 1;
        let change_id = nanoid!();
        info!("preparing change {} at version {}", change_id, version);

        let message = PrepareMessage {
            change_id: change_id.clone(),
            version,
            change,
            host: self.environment.host.clone(),
            user: self.environment.user.clone(),
        };
        let all = self.all_nodes();
        let responses = self
            .fan_out(&all, |endpoint| {
                let message = message.clone();
                async move { endpoint.prepare(message).await }
            })
            .await;

        let mut reports = Vec::with_capacity(responses.len());
        let mut hashes = Vec::with_capacity(responses.len());
        for (endpoint, response) in self.endpoints.iter().zip(responses) {
            let address = endpoint.address();
            match response {
                Ok(PrepareResponse::Accepted { result_hash, .. }) => {
                    debug!("{} accepted {} with hash {}", address, change_id, result_hash);
                    reports.push(NodeReport::new(address, PhaseResult::Ok));
                    hashes.push(Some(result_hash));
                }
                Ok(PrepareResponse::Rejected(rejection)) => {
                    warn!("{} rejected {}: {}", address, change_id, rejection);
                    reports.push(NodeReport::new(address, PhaseResult::Rejected(rejection.to_string())));
                    hashes.push(None);
                }
                Err(e) => {
                    warn!("prepare of {} failed on {}: {}", change_id, address, e);
                    reports.push(NodeReport::new(address, PhaseResult::Failed(e.to_string())));
                    hashes.push(None);
                }
            }
        }
        mark_divergent_hashes(&mut reports, &hashes);

        let (decision, targets) = if reports.iter().all(|report| report.prepare.is_ok()) {
            (Decision::Commit, all)
        } else {
            let accepted: Vec<usize> = hashes
                .iter()
                .enumerate()
                .filter(|(_, hash)| hash.is_some())
                .map(|(i, _)| i)
                .collect();
            (Decision::Rollback, accepted)
        };

        let results = self.decide(decision, &change_id, &targets).await;
        let mut requires_restart = false;
        let mut all_ok = true;
        for (&i, (result, restart)) in targets.iter().zip(results) {
            all_ok &= result.is_ok();
            requires_restart |= restart;
            reports[i].decision = Some(result);
            reports[i].requires_restart = restart;
        }

        let status = status_of(decision, all_ok);
        info!("change {} finished {:?}", change_id, status);
        Ok(ChangeOutcome {
            change_id,
            version,
            status,
            requires_restart,
            nodes: reports,
        })
    }

    /// Resolves every change some node still holds prepared.
    ///
    /// A change that reached `Committed` on any node is committed where it is
    /// still prepared; otherwise it is rolled back everywhere.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> Result<Vec<ChangeOutcome>> {
        let views = self.discover().await?;
        Ok(self.recover_from(&views).await)
    }

    async fn recover_from(
        &self,
        views: &[DiscoverResponse],
    ) -> Vec<ChangeOutcome> {
        let mut stuck: Vec<(&ChangeDetails, Vec<usize>)> = Vec::new();
        for (i, view) in views.iter().enumerate() {
            let Some(details) = view.prepared_change() else {
                continue;
            };
            match stuck.iter_mut().find(|(known, _)| known.change_id == details.change_id) {
                Some((_, nodes)) => nodes.push(i),
                None => stuck.push((details, vec![i])),
            }
        }

        let mut outcomes = Vec::with_capacity(stuck.len());
        for (details, targets) in stuck {
            let committed_elsewhere = views.iter().any(|view| {
                view.latest_change.as_ref().is_some_and(|latest| {
                    latest.change_id == details.change_id && latest.state == ChangeRequestState::Committed
                })
            });
            let decision = if committed_elsewhere {
                Decision::Commit
            } else {
                Decision::Rollback
            };
            info!(
                "recovering change {} on {} nodes: {:?}",
                details.change_id,
                targets.len(),
                decision
            );

            let results = self.decide(decision, &details.change_id, &targets).await;
            let mut requires_restart = false;
            let mut all_ok = true;
            let nodes = targets
                .iter()
                .zip(results)
                .map(|(&i, (result, restart))| {
                    all_ok &= result.is_ok();
                    requires_restart |= restart;
                    NodeReport {
                        address: self.endpoints[i].address(),
                        prepare: PhaseResult::Ok,
                        decision: Some(result),
                        requires_restart: restart,
                    }
                })
                .collect();

            outcomes.push(ChangeOutcome {
                change_id: details.change_id.clone(),
                version: details.version,
                status: status_of(decision, all_ok),
                requires_restart,
                nodes,
            });
        }
        outcomes
    }

    /// Sends the decision to `targets`; returns per target its result and restart flag
    async fn decide(
        &self,
        decision: Decision,
        change_id: &str,
        targets: &[usize],
    ) -> Vec<(PhaseResult, bool)> {
        let host = self.environment.host.clone();
        let user = self.environment.user.clone();
        let change_id = change_id.to_string();

        match decision {
            Decision::Commit => {
                let message = CommitMessage {
                    change_id: change_id.clone(),
                    host,
                    user,
                };
                self.fan_out(targets, |endpoint| {
                    let message = message.clone();
                    async move { endpoint.commit(message).await }
                })
                .await
                .into_iter()
                .zip(targets)
                .map(|(result, &i)| match result {
                    Ok(response) => (PhaseResult::Ok, response.requires_restart),
                    Err(e) => {
                        error!("commit of {} failed on {}: {}", change_id, self.endpoints[i].address(), e);
                        (PhaseResult::Failed(e.to_string()), false)
                    }
                })
                .collect()
            }
            Decision::Rollback => {
                let message = RollbackMessage {
                    change_id: change_id.clone(),
                    host,
                    user,
                };
                self.fan_out(targets, |endpoint| {
                    let message = message.clone();
                    async move { endpoint.rollback(message).await }
                })
                .await
                .into_iter()
                .zip(targets)
                .map(|(result, &i)| match result {
                    Ok(_) => (PhaseResult::Ok, false),
                    Err(e) => {
                        error!("rollback of {} failed on {}: {}", change_id, self.endpoints[i].address(), e);
                        (PhaseResult::Failed(e.to_string()), false)
                    }
                })
                .collect()
            }
        }
    }

    fn check_consistency(
        &self,
        views: &[DiscoverResponse],
    ) -> Result<()> {
        let Some(first) = views.first() else {
            return Err(ChangeError::EmptyNodeSet.into());
        };
        for (endpoint, view) in self.endpoints.iter().zip(views).skip(1) {
            if view.state.current_version != first.state.current_version
                || view.current_config_hash != first.current_config_hash
            {
                return Err(ChangeError::InconsistentCluster(format!(
                    "{} is at version {} ({}) while {} is at version {} ({})",
                    endpoint.address(),
                    view.state.current_version,
                    view.current_config_hash.as_deref().unwrap_or("no document"),
                    self.endpoints[0].address(),
                    first.state.current_version,
                    first.current_config_hash.as_deref().unwrap_or("no document"),
                ))
                .into());
            }
        }
        Ok(())
    }

    fn all_nodes(&self) -> Vec<usize> {
        (0..self.endpoints.len()).collect()
    }

    async fn fan_out<T, F, Fut>(
        &self,
        targets: &[usize],
        call: F,
    ) -> Vec<Result<T>>
    where
        T: Send + 'static,
        F: Fn(Arc<dyn ChangeEndpoint>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let calls = targets
            .iter()
            .map(|&i| {
                let endpoint = self.endpoints[i].clone();
                (endpoint.address(), call(endpoint))
            })
            .collect();
        fan_out::bounded(
            calls,
            self.sizing.threads_for(targets.len()),
            self.request_timeout,
            fan_out::request_timeout,
        )
        .await
    }
}

fn status_of(
    decision: Decision,
    all_ok: bool,
) -> ChangeStatus {
    match (decision, all_ok) {
        (_, false) => ChangeStatus::Inconsistent,
        (Decision::Commit, true) => ChangeStatus::Committed,
        (Decision::Rollback, true) => ChangeStatus::RolledBack,
    }
}

/// Rejects accepted nodes whose document differs from the most common one
fn mark_divergent_hashes(
    reports: &mut [NodeReport],
    hashes: &[Option<String>],
) {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for hash in hashes.iter().flatten() {
        match counts.iter_mut().find(|(known, _)| *known == hash.as_str()) {
            Some((_, count)) => *count += 1,
            None => counts.push((hash.as_str(), 1)),
        }
    }
    if counts.len() <= 1 {
        return;
    }

    let mut reference = counts[0];
    for candidate in &counts[1..] {
        if candidate.1 > reference.1 {
            reference = *candidate;
        }
    }
    let reference = reference.0;

    for (report, hash) in reports.iter_mut().zip(hashes) {
        if let Some(hash) = hash {
            if hash != reference {
                warn!("{} rendered {} instead of {}", report.address, hash, reference);
                report.prepare = PhaseResult::Rejected(format!("result hash {hash} differs from {reference}"));
            }
        }
    }
}
