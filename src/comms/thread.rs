use super::{Comms, ReduceOp, Reducible};
use crate::error::{GraphError, Result};
use std::any::Any;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

type Slot = Option<Box<dyn Any + Send>>;

/// In-process communicator: one rank per host thread
///
/// Ranks exchange data through shared slots guarded by an abortable barrier.
/// Every collective posts this rank's payload, waits for all ranks, reads the
/// full set, then waits again so no slot is overwritten while still being
/// read. Once any rank aborts, every pending and future collective fails with
/// `CommunicationFailure` instead of blocking.
///
/// # Example
///
/// ```
/// use shardgraph::comms::{Comms, ReduceOp, ThreadComms};
///
/// let sums = ThreadComms::launch(3, |comms| {
///     comms.all_reduce_scalar(comms.rank() as u64 + 1, ReduceOp::Sum)
/// })
/// .unwrap();
/// assert_eq!(sums, vec![6, 6, 6]);
/// ```
#[derive(Clone)]
pub struct ThreadComms {
    shared: Arc<Shared>,
    rank: usize,
}

struct Shared {
    size: usize,
    slots: Mutex<Vec<Slot>>,
    barrier: AbortableBarrier,
}

impl std::fmt::Debug for ThreadComms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComms")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl ThreadComms {
    /// Create the communicators of a `size`-rank group, indexed by rank
    ///
    /// # Errors
    ///
    /// Returns `InvalidCall` if `size` is zero
    pub fn group(size: usize) -> Result<Vec<Self>> {
        if size == 0 {
            return Err(GraphError::InvalidCall(
                "communicator needs at least one rank".to_string(),
            ));
        }
        let shared = Arc::new(Shared {
            size,
            slots: Mutex::new((0..size).map(|_| None).collect()),
            barrier: AbortableBarrier::new(size),
        });
        Ok((0..size)
            .map(|rank| Self {
                shared: Arc::clone(&shared),
                rank,
            })
            .collect())
    }

    /// Run `f` on `size` scoped threads, one per rank, and collect the results in rank order
    ///
    /// A rank that returns an error or panics aborts the group, so the others
    /// fail out of their pending collectives. The error reported is the one
    /// from the rank that aborted first.
    ///
    /// # Errors
    ///
    /// The first aborting rank's error, or `CommunicationFailure` if it panicked
    pub fn launch<T, F>(size: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(Self) -> Result<T> + Sync,
    {
        let group = Self::group(size)?;
        let shared = Arc::clone(&group[0].shared);

        let joined: Vec<Result<T>> = std::thread::scope(|s| {
            let handles: Vec<_> = group
                .into_iter()
                .map(|comms| {
                    let f = &f;
                    s.spawn(move || {
                        let _guard = AbortOnPanic(&comms);
                        let span = tracing::debug_span!("rank", rank = comms.rank);
                        let _enter = span.enter();
                        let result = f(comms.clone());
                        if let Err(err) = &result {
                            comms.abort(&err.to_string());
                        }
                        result
                    })
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(GraphError::CommunicationFailure(format!(
                            "rank {rank} panicked"
                        )))
                    })
                })
                .collect()
        });

        let origin = shared.barrier.origin();
        let mut values = Vec::with_capacity(size);
        let mut errors: Vec<Option<GraphError>> = Vec::with_capacity(size);
        for result in joined {
            match result {
                Ok(v) => {
                    values.push(v);
                    errors.push(None);
                }
                Err(e) => errors.push(Some(e)),
            }
        }

        if values.len() == size {
            return Ok(values);
        }
        let preferred = origin.and_then(|r| errors.get_mut(r).and_then(Option::take));
        match preferred.or_else(|| errors.into_iter().flatten().next()) {
            Some(err) => Err(err),
            None => Err(GraphError::CommunicationFailure(
                "rank results missing".to_string(),
            )),
        }
    }

    fn slots(&self) -> Result<MutexGuard<'_, Vec<Slot>>> {
        self.shared
            .slots
            .lock()
            .map_err(|_| GraphError::CommunicationFailure("exchange slots poisoned".to_string()))
    }

    /// Post `local`, wait for every rank, and read all posted payloads in rank order
    fn exchange<T: Clone + Send + 'static>(&self, local: Vec<T>) -> Result<Vec<Vec<T>>> {
        self.slots()?[self.rank] = Some(Box::new(local));
        self.shared.barrier.wait()?;

        let gathered = {
            let slots = self.slots()?;
            slots
                .iter()
                .enumerate()
                .map(|(rank, slot)| {
                    slot.as_ref()
                        .and_then(|payload| payload.downcast_ref::<Vec<T>>())
                        .cloned()
                        .ok_or_else(|| {
                            GraphError::CommunicationFailure(format!(
                                "rank {rank} posted a payload of a different type"
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()
        };
        let gathered = match gathered {
            Ok(g) => g,
            Err(err) => {
                self.abort(&err.to_string());
                return Err(err);
            }
        };

        self.shared.barrier.wait()?;
        // Every rank has copied out; release this rank's payload
        self.slots()?[self.rank] = None;
        Ok(gathered)
    }
}

impl Comms for ThreadComms {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> Result<()> {
        self.shared.barrier.wait()
    }

    fn broadcast<T: Clone + Send + 'static>(&self, data: Vec<T>, root: usize) -> Result<Vec<T>> {
        if root >= self.shared.size {
            return Err(GraphError::InvalidCall(format!(
                "broadcast root {root} outside communicator of size {}",
                self.shared.size
            )));
        }
        let local = if self.rank == root { data } else { Vec::new() };
        let mut gathered = self.exchange(local)?;
        Ok(gathered.swap_remove(root))
    }

    fn all_gather_v<T: Clone + Send + 'static>(&self, local: &[T]) -> Result<Vec<Vec<T>>> {
        self.exchange(local.to_vec())
    }

    fn all_reduce<T: Reducible>(&self, buf: &mut [T], op: ReduceOp) -> Result<()> {
        let gathered = self.exchange(buf.to_vec())?;
        if let Some((rank, other)) = gathered
            .iter()
            .enumerate()
            .find(|(_, g)| g.len() != buf.len())
        {
            return Err(GraphError::CommunicationFailure(format!(
                "all_reduce length mismatch: rank {} has {}, rank {rank} has {}",
                self.rank,
                buf.len(),
                other.len()
            )));
        }
        for (i, slot) in buf.iter_mut().enumerate() {
            let mut acc = gathered[0][i];
            for contribution in &gathered[1..] {
                acc = acc.reduce(contribution[i], op);
            }
            *slot = acc;
        }
        Ok(())
    }

    fn abort(&self, reason: &str) {
        if self.shared.barrier.abort(self.rank, reason) {
            tracing::error!(rank = self.rank, reason, "communicator aborted");
        }
    }
}

struct AbortOnPanic<'a>(&'a ThreadComms);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.abort(&format!("rank {} panicked", self.0.rank));
        }
    }
}

/// Generation barrier that can be torn down from any rank
struct AbortableBarrier {
    size: usize,
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: Option<(usize, String)>,
}

impl AbortableBarrier {
    fn new(size: usize) -> Self {
        Self {
            size,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                aborted: None,
            }),
            cvar: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BarrierState>> {
        self.state
            .lock()
            .map_err(|_| GraphError::CommunicationFailure("barrier poisoned".to_string()))
    }

    fn aborted_error(state: &BarrierState) -> Option<GraphError> {
        state.aborted.as_ref().map(|(rank, reason)| {
            GraphError::CommunicationFailure(format!("aborted by rank {rank}: {reason}"))
        })
    }

    fn wait(&self) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(err) = Self::aborted_error(&state) {
            return Err(err);
        }

        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.size {
            state.arrived = 0;
            state.generation += 1;
            self.cvar.notify_all();
            return Ok(());
        }

        while state.generation == generation && state.aborted.is_none() {
            state = self
                .cvar
                .wait(state)
                .map_err(|_| GraphError::CommunicationFailure("barrier poisoned".to_string()))?;
        }
        if state.generation != generation {
            return Ok(());
        }
        Err(Self::aborted_error(&state).unwrap_or_else(|| {
            GraphError::CommunicationFailure("barrier released without progress".to_string())
        }))
    }

    /// Returns true if this call performed the abort
    fn abort(&self, rank: usize, reason: &str) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.aborted.is_some() {
            return false;
        }
        state.aborted = Some((rank, reason.to_string()));
        self.cvar.notify_all();
        true
    }

    fn origin(&self) -> Option<usize> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.aborted.as_ref().map(|(rank, _)| *rank))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_gather_v_variable_lengths() {
        let results = ThreadComms::launch(3, |comms| {
            let local: Vec<u32> = (0..comms.rank() as u32).collect();
            comms.all_gather_v(&local)
        })
        .unwrap();

        for gathered in results {
            assert_eq!(gathered, vec![vec![], vec![0], vec![0, 1]]);
        }
    }

    #[test]
    fn test_payloads_released_after_exchange() {
        let counts = ThreadComms::launch(3, |comms| {
            let tracker = Arc::new(comms.rank());
            let gathered = comms.all_gather_v(&[Arc::clone(&tracker)])?;
            assert_eq!(gathered.len(), 3);
            drop(gathered);
            comms.barrier()?;

            assert!(comms.slots()?.iter().all(Option::is_none));
            Ok(Arc::strong_count(&tracker))
        })
        .unwrap();

        assert_eq!(counts, vec![1, 1, 1]);
    }

    #[test]
    fn test_broadcast_from_root() {
        let results = ThreadComms::launch(4, |comms| {
            let data = if comms.rank() == 2 { vec![7_i64, 8] } else { vec![] };
            comms.broadcast(data, 2)
        })
        .unwrap();
        assert!(results.iter().all(|r| r == &vec![7, 8]));
    }

    #[test]
    fn test_all_reduce_ops() {
        let results = ThreadComms::launch(3, |comms| {
            let r = comms.rank() as i32;
            let mut sum = [r, 10 * r];
            comms.all_reduce(&mut sum, ReduceOp::Sum)?;
            let min = comms.all_reduce_scalar(r - 1, ReduceOp::Min)?;
            let max = comms.all_reduce_scalar(r as f64 * 0.5, ReduceOp::Max)?;
            Ok((sum, min, max))
        })
        .unwrap();

        for (sum, min, max) in results {
            assert_eq!(sum, [3, 30]);
            assert_eq!(min, -1);
            assert!((max - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_float_sum_identical_on_every_rank() {
        let results = ThreadComms::launch(4, |comms| {
            let v = 0.1_f64 * (comms.rank() as f64 + 1.0) / 3.0;
            comms.all_reduce_scalar(v, ReduceOp::Sum)
        })
        .unwrap();
        let first = results[0].to_bits();
        assert!(results.iter().all(|r| r.to_bits() == first));
    }

    #[test]
    fn test_repeated_collectives_do_not_interleave() {
        let results = ThreadComms::launch(2, |comms| {
            let mut seen = Vec::new();
            for round in 0..50_u32 {
                let gathered = comms.all_gather_v(&[round * 10 + comms.rank() as u32])?;
                seen.push(gathered.concat());
            }
            Ok(seen)
        })
        .unwrap();

        for seen in results {
            for (round, values) in seen.iter().enumerate() {
                let base = round as u32 * 10;
                assert_eq!(values, &vec![base, base + 1]);
            }
        }
    }

    #[test]
    fn test_error_on_one_rank_aborts_the_others() {
        let err = ThreadComms::launch(3, |comms| {
            if comms.rank() == 1 {
                return Err(GraphError::InvalidCall("rank 1 gave up".to_string()));
            }
            comms.barrier()?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }

    #[test]
    fn test_panic_on_one_rank_aborts_the_others() {
        let err = ThreadComms::launch(2, |comms| {
            assert!(comms.rank() != 0, "rank 0 fails");
            comms.barrier()?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::CommunicationFailure(_)));
    }

    #[test]
    fn test_type_mismatch_is_communication_failure() {
        let err = ThreadComms::launch(2, |comms| {
            if comms.rank() == 0 {
                comms.all_gather_v(&[1_u32])?;
            } else {
                comms.all_gather_v(&[1.0_f64])?;
            }
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GraphError::CommunicationFailure(_)));
    }

    #[test]
    fn test_zero_ranks_rejected() {
        let err = ThreadComms::launch(0, |_comms| Ok(())).unwrap_err();
        assert!(matches!(err, GraphError::InvalidCall(_)));
    }

    #[test]
    fn test_size_and_rank() {
        let ranks = ThreadComms::launch(4, |comms| Ok((comms.rank(), comms.size()))).unwrap();
        assert_eq!(ranks, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
    }
}
