//! Cross-device collective layer
//!
//! A thin synchronous contract over whatever transport connects the ranks:
//! broadcast, variable-length all-gather, and element-wise all-reduce. Every
//! rank must issue the same collectives in the same order; skipping one on
//! some ranks deadlocks, which is a caller bug, not a recoverable error.
//! Transport failures are fatal for the whole distributed call.
//!
//! - [`SingleComms`]: one rank, every collective is the identity
//! - [`ThreadComms`]: in-process ranks on host threads

mod single;
mod thread;

pub use single::SingleComms;
pub use thread::ThreadComms;

use crate::error::Result;

/// Element-wise reduction operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Sum of all ranks' values
    Sum,
    /// Minimum over ranks
    Min,
    /// Maximum over ranks
    Max,
}

/// Element types accepted by [`Comms::all_reduce`]
pub trait Reducible: Copy + Send + Sync + 'static {
    /// Combine two values under `op`
    #[must_use]
    fn reduce(self, other: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_reducible {
    ($($t:ty),*) => {$(
        impl Reducible for $t {
            fn reduce(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => self + other,
                    ReduceOp::Min => self.min(other),
                    ReduceOp::Max => self.max(other),
                }
            }
        }
    )*};
}

impl_reducible!(u32, u64, i32, i64, usize, f32, f64);

/// Collective communication between the ranks holding one graph's shards
pub trait Comms: Sync {
    /// This rank's index in `0..size()`
    fn rank(&self) -> usize;

    /// Number of ranks
    fn size(&self) -> usize;

    /// True for the single-device path
    fn is_single(&self) -> bool {
        self.size() == 1
    }

    /// Block until every rank arrives
    ///
    /// # Errors
    ///
    /// `CommunicationFailure` if the communicator was aborted
    fn barrier(&self) -> Result<()>;

    /// Every rank receives `root`'s `data`; non-root input is ignored
    ///
    /// # Errors
    ///
    /// `CommunicationFailure` on transport failure
    fn broadcast<T: Clone + Send + 'static>(&self, data: Vec<T>, root: usize) -> Result<Vec<T>>;

    /// Every rank receives every rank's (variable-length) buffer, in rank order
    ///
    /// # Errors
    ///
    /// `CommunicationFailure` on transport failure
    fn all_gather_v<T: Clone + Send + 'static>(&self, local: &[T]) -> Result<Vec<Vec<T>>>;

    /// Element-wise reduction of equally sized buffers, result on every rank
    ///
    /// Ranks' contributions are combined in rank order, so every rank ends up
    /// with bit-identical values.
    ///
    /// # Errors
    ///
    /// `CommunicationFailure` on transport failure or if buffer lengths differ
    fn all_reduce<T: Reducible>(&self, buf: &mut [T], op: ReduceOp) -> Result<()>;

    /// All-reduce of a single value
    ///
    /// # Errors
    ///
    /// `CommunicationFailure` on transport failure
    fn all_reduce_scalar<T: Reducible>(&self, value: T, op: ReduceOp) -> Result<T> {
        let mut buf = [value];
        self.all_reduce(&mut buf, op)?;
        Ok(buf[0])
    }

    /// Abort the communicator; pending and future collectives on every rank fail
    fn abort(&self, reason: &str);
}
