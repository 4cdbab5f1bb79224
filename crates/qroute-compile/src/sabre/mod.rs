//! SABRE swap-based routing.
//!
//! The router keeps a front layer of operations whose operands are all
//! available, retires every front operation that already acts on adjacent
//! physical qubits, and otherwise inserts the swap that minimises the
//! distance of the front layer plus a weighted lookahead over the next
//! two-qubit operations. Per-qubit decay discourages swapping the same
//! qubits over and over. Measurements are held back until nothing else
//! remains.

mod frontier;
mod router;

pub use frontier::{Frontier, VirtualOp, WireMap};
pub use router::{RoutingStats, SabreRouter};
