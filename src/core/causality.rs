//! Backward tracing of the synapse chains behind a motor spike.
//!
//! Runs once per tick, after propagation and before the history shift, so
//! history slot `d` still means "delivered d ticks before the spike being
//! traced". The tracer only reads neuron histories and only writes the
//! per-tick `highlighted` flag; it never touches the functional state.

use crate::substrate::{Neuron, NeuronId, Synapse, MOTOR_LEFT, MOTOR_RIGHT};

/// Maximum backward depth, in ticks, of a traced chain.
pub const MAX_TRACE: usize = 12;

/// Highlight every synapse in the causal chain of each motor that spiked
/// this tick.
pub fn highlight_motor_chains(neurons: &[Neuron], connections: &mut [Vec<Synapse>]) {
    for m in [MOTOR_LEFT, MOTOR_RIGHT] {
        if m >= neurons.len() || !neurons[m].spiked_this_step {
            continue;
        }
        // One visited set per depth keeps the walk linear in the history
        // size instead of exponential in chain fan-in.
        let mut visited = vec![vec![false; neurons.len()]; MAX_TRACE + 1];
        visited[0][m] = true;
        trace(neurons, connections, m, 0, &mut visited);
    }
}

fn trace(
    neurons: &[Neuron],
    connections: &mut [Vec<Synapse>],
    at: NeuronId,
    depth: usize,
    visited: &mut [Vec<bool>],
) {
    for c in &neurons[at].contrib_history[depth] {
        connections[c.from][c.syn].highlighted = true;

        // Follow the chain only while the source actually spiked at the
        // matching point in the past.
        if neurons[c.from].spike_history[depth]
            && depth + 1 <= MAX_TRACE
            && !visited[depth + 1][c.from]
        {
            visited[depth + 1][c.from] = true;
            trace(neurons, connections, c.from, depth + 1, visited);
        }
    }
}
