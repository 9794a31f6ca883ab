use std::collections::HashMap;

use parking_lot::Mutex;

use crate::ChangeRequest;
use crate::ChangeStateStore;
use crate::Error;
use crate::NodeState;
use crate::Result;
use crate::StateChange;
use crate::StorageError;

#[derive(Debug, Default)]
struct MemState {
    node_state: NodeState,
    requests: HashMap<String, ChangeRequest>,
}

/// Non-durable [`ChangeStateStore`].
///
/// A change is validated in full against a staged copy before anything is
/// written, so a failed [`apply`](ChangeStateStore::apply) leaves no trace.
#[derive(Debug, Default)]
pub struct MemChangeStateStore {
    inner: Mutex<MemState>,
}

impl MemChangeStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeStateStore for MemChangeStateStore {
    fn node_state(&self) -> Result<NodeState> {
        Ok(self.inner.lock().node_state.clone())
    }

    fn change_request(
        &self,
        change_id: &str,
    ) -> Result<Option<ChangeRequest>> {
        Ok(self.inner.lock().requests.get(change_id).cloned())
    }

    fn change_history(&self) -> Result<Vec<ChangeRequest>> {
        let mut requests: Vec<ChangeRequest> = self.inner.lock().requests.values().cloned().collect();
        requests.sort_by_key(|r| (r.version, r.creation_timestamp));
        Ok(requests)
    }

    fn apply(
        &self,
        change: StateChange,
    ) -> Result<()> {
        let mut state = self.inner.lock();

        let mut staged: HashMap<String, ChangeRequest> = HashMap::new();
        for request in change.created() {
            if state.requests.contains_key(&request.change_id) || staged.contains_key(&request.change_id) {
                return Err(Error::Fatal(format!(
                    "change request {} already exists",
                    request.change_id
                )));
            }
            staged.insert(request.change_id.clone(), request.clone());
        }

        for (change_id, next) in change.transitions() {
            let current = staged
                .get(change_id)
                .or_else(|| state.requests.get(change_id))
                .ok_or_else(|| StorageError::ChangeRequestNotFound {
                    change_id: change_id.clone(),
                })?;
            let updated = current.transitioned(*next)?;
            staged.insert(change_id.clone(), updated);
        }

        let node_state = change.merge_into(&state.node_state)?;

        state.requests.extend(staged);
        state.node_state = node_state;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
