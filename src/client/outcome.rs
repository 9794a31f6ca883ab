use std::fmt;

use crate::ChangeError;
use crate::Result;

/// What one node answered in one protocol phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseResult {
    Ok,
    /// The node refused, with its reason
    Rejected(String),
    /// The call did not complete (unreachable, timeout, storage failure)
    Failed(String),
}

impl PhaseResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, PhaseResult::Ok)
    }
}

impl fmt::Display for PhaseResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            PhaseResult::Ok => f.write_str("ok"),
            PhaseResult::Rejected(reason) => write!(f, "rejected: {reason}"),
            PhaseResult::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub address: String,
    pub prepare: PhaseResult,
    /// Commit or rollback result, `None` if the node needed neither
    pub decision: Option<PhaseResult>,
    pub requires_restart: bool,
}

impl NodeReport {
    pub(crate) fn new(
        address: impl Into<String>,
        prepare: PhaseResult,
    ) -> Self {
        Self {
            address: address.into(),
            prepare,
            decision: None,
            requires_restart: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Every node committed
    Committed,
    /// The change was refused and every node that accepted it rolled back
    RolledBack,
    /// The decision reached some nodes only; the rest stay prepared until recovery
    Inconsistent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOutcome {
    pub change_id: String,
    pub version: u64,
    pub status: ChangeStatus,
    /// Whether any committing node needs a restart for the change to take full effect
    pub requires_restart: bool,
    /// In the order the coordinator was given its nodes
    pub nodes: Vec<NodeReport>,
}

impl ChangeOutcome {
    pub fn is_committed(&self) -> bool {
        self.status == ChangeStatus::Committed
    }

    /// `address: reason` for every node that did not answer ok in some phase
    pub fn failures(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter_map(|node| {
                let failed = [Some(&node.prepare), node.decision.as_ref()]
                    .into_iter()
                    .flatten()
                    .find(|phase| !phase.is_ok())?;
                Some(format!("{}: {}", node.address, failed))
            })
            .collect()
    }

    /// Maps anything but a full commit to [`ChangeError::Rejected`]
    pub fn into_result(self) -> Result<ChangeOutcome> {
        if self.is_committed() {
            return Ok(self);
        }
        let mut details = self.failures();
        if details.is_empty() {
            details.push(format!("change ended {:?}", self.status));
        }
        Err(ChangeError::Rejected {
            change_id: self.change_id,
            details: details.join("; "),
        }
        .into())
    }
}
