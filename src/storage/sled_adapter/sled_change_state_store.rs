use sled::transaction::abort;
use sled::transaction::ConflictableTransactionResult;
use sled::transaction::TransactionError;
use sled::transaction::TransactionalTree;
use tracing::debug;
use tracing::instrument;
use tracing::trace;

use super::CHANGE_REQUEST_PREFIX;
use super::CHANGE_STATE_NAMESPACE;
use super::NODE_STATE_KEY;
use crate::utils::convert::change_request_key;
use crate::ChangeRequest;
use crate::ChangeStateStore;
use crate::Error;
use crate::NodeState;
use crate::Result;
use crate::StateChange;
use crate::StorageError;

/// Change requests and the node-state record in the `change_state` tree.
///
/// Every [`StateChange`] runs as one sled transaction.
pub struct SledChangeStateStore {
    tree: sled::Tree,
}

impl std::fmt::Debug for SledChangeStateStore {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("SledChangeStateStore").field("tree", &CHANGE_STATE_NAMESPACE).finish()
    }
}

impl SledChangeStateStore {
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree(CHANGE_STATE_NAMESPACE)?;
        Ok(Self { tree })
    }

    fn apply_in_transaction(
        tx: &TransactionalTree,
        change: &StateChange,
    ) -> ConflictableTransactionResult<(), Error> {
        for request in change.created() {
            let key = change_request_key(&request.change_id);
            if tx.get(&key)?.is_some() {
                return abort(Error::Fatal(format!(
                    "change request {} already exists",
                    request.change_id
                )));
            }
            let value = match bincode::serialize(request) {
                Ok(value) => value,
                Err(e) => return abort(e.into()),
            };
            tx.insert(key, value)?;
        }

        for (change_id, state) in change.transitions() {
            let key = change_request_key(change_id);
            let existing: ChangeRequest = match tx.get(&key)? {
                Some(bytes) => match bincode::deserialize(&bytes) {
                    Ok(request) => request,
                    Err(e) => return abort(e.into()),
                },
                None => {
                    return abort(
                        StorageError::ChangeRequestNotFound {
                            change_id: change_id.clone(),
                        }
                        .into(),
                    )
                }
            };
            let updated = match existing.transitioned(*state) {
                Ok(updated) => updated,
                Err(e) => return abort(e),
            };
            let value = match bincode::serialize(&updated) {
                Ok(value) => value,
                Err(e) => return abort(e.into()),
            };
            tx.insert(key, value)?;
        }

        if change.touches_node_state() {
            let base = match tx.get(NODE_STATE_KEY)? {
                Some(bytes) => match bincode::deserialize::<NodeState>(&bytes) {
                    Ok(state) => state,
                    Err(e) => return abort(e.into()),
                },
                None => NodeState::default(),
            };
            let next = match change.merge_into(&base) {
                Ok(next) => next,
                Err(e) => return abort(e),
            };
            let value = match bincode::serialize(&next) {
                Ok(value) => value,
                Err(e) => return abort(e.into()),
            };
            tx.insert(NODE_STATE_KEY, value)?;
        }

        Ok(())
    }
}

impl ChangeStateStore for SledChangeStateStore {
    #[instrument(skip(self))]
    fn node_state(&self) -> Result<NodeState> {
        match self.tree.get(NODE_STATE_KEY)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(NodeState::default()),
        }
    }

    #[instrument(skip(self))]
    fn change_request(
        &self,
        change_id: &str,
    ) -> Result<Option<ChangeRequest>> {
        match self.tree.get(change_request_key(change_id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn change_history(&self) -> Result<Vec<ChangeRequest>> {
        let mut requests = Vec::new();
        for item in self.tree.scan_prefix(CHANGE_REQUEST_PREFIX) {
            let (_, value) = item?;
            requests.push(bincode::deserialize::<ChangeRequest>(&value)?);
        }
        requests.sort_by_key(|r| (r.version, r.creation_timestamp));
        Ok(requests)
    }

    #[instrument(skip(self, change))]
    fn apply(
        &self,
        change: StateChange,
    ) -> Result<()> {
        if change.is_empty() {
            trace!("empty state change, nothing to persist");
            return Ok(());
        }

        self.tree
            .transaction(|tx| Self::apply_in_transaction(tx, &change))
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => Error::from(e),
            })?;

        self.tree.flush()?;
        debug!(
            "applied state change: {} created, {} transitions",
            change.created().len(),
            change.transitions().len()
        );
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.tree.flush()?;
        Ok(())
    }
}
