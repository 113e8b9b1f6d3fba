//! Read-only per-tick state records for the host boundary.
//!
//! Field names are contractual: the browser side indexes into these objects
//! by name. Capturing is on-demand and may allocate; the tick loop itself
//! stays untouched.

use serde::Serialize;

use crate::substrate::SpikingNet;
use crate::world::World;

/// Running counters the driver accumulates across one life of the brain.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub reward: bool,
    pub penalty: bool,
    pub reward_sum: u64,
    pub penalty_sum: u64,
    pub food_time: u64,
    pub danger_time: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            // The first tick runs with reward latched on.
            reward: true,
            penalty: false,
            reward_sum: 0,
            penalty_sum: 0,
            food_time: 0,
            danger_time: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TickSnapshot {
    pub t: u64,
    pub reward: bool,
    pub penalty: bool,
    pub reward_sum: u64,
    pub penalty_sum: u64,
    pub food_time: u64,
    pub danger_time: u64,
    pub world: WorldSnapshot,
    pub neurons: Vec<NeuronSnapshot>,
    pub synapses: Vec<SynapseSnapshot>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WorldSnapshot {
    pub agent: i32,
    pub target: i32,
    #[serde(rename = "type")]
    pub kind: u8,
    pub food: u32,
    pub danger: u32,
    pub dist: i32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct NeuronSnapshot {
    pub id: usize,
    pub v: i32,
    pub s: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SynapseSnapshot {
    pub s: usize,
    pub t: usize,
    pub c: i32,
    pub a: bool,
    /// Highlight bit from the causal trace.
    pub b: u8,
}

impl TickSnapshot {
    pub fn capture(tick: u64, net: &SpikingNet, world: &World, stats: &RunStats) -> Self {
        let neurons = net
            .neurons
            .iter()
            .enumerate()
            .map(|(id, n)| NeuronSnapshot {
                id,
                v: n.voltage,
                s: n.spiked_this_step,
            })
            .collect();

        let synapses = net
            .connections
            .iter()
            .enumerate()
            .flat_map(|(s, row)| {
                row.iter().map(move |syn| SynapseSnapshot {
                    s,
                    t: syn.target,
                    c: syn.confidence,
                    a: syn.active,
                    b: syn.highlighted as u8,
                })
            })
            .collect();

        Self {
            t: tick,
            reward: stats.reward,
            penalty: stats.penalty,
            reward_sum: stats.reward_sum,
            penalty_sum: stats.penalty_sum,
            food_time: stats.food_time,
            danger_time: stats.danger_time,
            world: WorldSnapshot {
                agent: world.agent_pos,
                target: world.target_pos,
                kind: world.target_kind.code(),
                food: world.food_eaten,
                danger: world.danger_hit,
                dist: world.distance(),
            },
            neurons,
            synapses,
        }
    }
}
