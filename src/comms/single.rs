use super::{Comms, ReduceOp, Reducible};
use crate::error::{GraphError, Result};

/// Communicator for the single-device path
///
/// Every collective is the identity; no synchronization is performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleComms;

impl Comms for SingleComms {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn broadcast<T: Clone + Send + 'static>(&self, data: Vec<T>, root: usize) -> Result<Vec<T>> {
        if root != 0 {
            return Err(GraphError::InvalidCall(format!(
                "broadcast root {root} outside communicator of size 1"
            )));
        }
        Ok(data)
    }

    fn all_gather_v<T: Clone + Send + 'static>(&self, local: &[T]) -> Result<Vec<Vec<T>>> {
        Ok(vec![local.to_vec()])
    }

    fn all_reduce<T: Reducible>(&self, _buf: &mut [T], _op: ReduceOp) -> Result<()> {
        Ok(())
    }

    fn abort(&self, reason: &str) {
        tracing::error!(reason, "single-rank communicator aborted");
    }
}
