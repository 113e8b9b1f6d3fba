use crate::causality;
use crate::params::Params;
use crate::prng::Prng;

pub type NeuronId = usize;

/// Neuron roles are a function of index range, never a subtype.
///
/// - `0..4`   sensors: driven by external input only, never a synapse target.
/// - `4..6`   motors: read out by the world, fed only by their fan-in relay.
/// - `6..10`  sensor fan-out: one fixed wire in from its sensor, sends to
///   free hidden only.
/// - `10..12` motor fan-in: one fixed wire out to its motor, receives from
///   free hidden only.
/// - `12..N`  free hidden.
pub const SENSOR_COUNT: usize = 4;
pub const MOTOR_LEFT: NeuronId = 4;
pub const MOTOR_RIGHT: NeuronId = 5;
pub const FIRST_FANOUT: NeuronId = 6;
pub const FIRST_FANIN: NeuronId = 10;
pub const FIRST_FREE_HIDDEN: NeuronId = 12;

/// How many past ticks of spike/contribution history every neuron keeps.
pub const MAX_HIST: usize = 32;

#[inline]
pub fn is_sensor(i: NeuronId) -> bool {
    i < SENSOR_COUNT
}

#[inline]
pub fn is_motor(i: NeuronId) -> bool {
    i == MOTOR_LEFT || i == MOTOR_RIGHT
}

#[inline]
pub fn is_fanout(i: NeuronId) -> bool {
    (FIRST_FANOUT..FIRST_FANIN).contains(&i)
}

#[inline]
pub fn is_fanin(i: NeuronId) -> bool {
    (FIRST_FANIN..FIRST_FREE_HIDDEN).contains(&i)
}

/// One conducting delivery into a neuron, addressed by indices so the
/// history never holds pointers into the synapse tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contribution {
    pub from: NeuronId,
    pub syn: usize,
}

#[derive(Debug, Clone)]
pub struct Neuron {
    pub voltage: i32,
    pub refractory_timer: u32,
    pub spiked_this_step: bool,

    // Presynaptic deliveries land here during propagation and are consumed
    // at the start of the next tick's integration.
    pub input_buffer: u32,
    pub leak_timer: u32,

    // Ring of the last MAX_HIST ticks, newest at index 0.
    // `contrib_history[d]` holds the deliveries of d ticks ago;
    // `spike_history[d]` whether this neuron spiked d ticks ago.
    pub contrib_history: Vec<Vec<Contribution>>,
    pub spike_history: [bool; MAX_HIST],
    pub(crate) next_contributors: Vec<Contribution>,
}

impl Neuron {
    fn new(p: &Params) -> Self {
        Self {
            voltage: p.v_rest,
            refractory_timer: 0,
            spiked_this_step: false,
            input_buffer: 0,
            leak_timer: p.membrane_decay_period,
            contrib_history: vec![Vec::new(); MAX_HIST],
            spike_history: [false; MAX_HIST],
            next_contributors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Synapse {
    pub target: NeuronId,

    // Integer weight surrogate. The synapse conducts iff `active`,
    // which is recomputed after every confidence change.
    pub confidence: i32,
    pub active: bool,

    // Fixed wires opt out of plasticity, leak and pruning entirely.
    pub plastic: bool,

    // Short pre/post spike traces.
    pub ltp_timer: u32,
    pub ltd_timer: u32,

    // Latched pre/post pairings waiting for a reinforcement signal.
    pub eligible_for_ltp: bool,
    pub eligible_for_ltd: bool,
    pub eligibility_ltp_timer: u32,
    pub eligibility_ltd_timer: u32,

    pub confidence_leak_timer: u32,

    // A successful modification locks the opposite arm for a while.
    pub reward_acceptor: bool,
    pub penalty_acceptor: bool,
    pub reward_inertia: u32,
    pub penalty_inertia: u32,

    // Ticks since this synapse last had an LTP pairing accepted by reward.
    // The largest value marks the pruning candidate.
    pub ticks_since_ltp: u64,

    // Set by the causal tracer, valid for exactly one tick.
    pub highlighted: bool,
}

impl Synapse {
    fn new(target: NeuronId, confidence: i32, plastic: bool, p: &Params) -> Self {
        Self {
            target,
            confidence,
            active: confidence >= p.confidence_thr,
            plastic,
            ltp_timer: 0,
            ltd_timer: 0,
            eligible_for_ltp: false,
            eligible_for_ltd: false,
            eligibility_ltp_timer: 0,
            eligibility_ltd_timer: 0,
            confidence_leak_timer: p.confidence_leak_period,
            reward_acceptor: true,
            penalty_acceptor: true,
            reward_inertia: 0,
            penalty_inertia: 0,
            ticks_since_ltp: 0,
            highlighted: false,
        }
    }

    #[inline]
    fn refresh_active(&mut self, thr: i32) {
        self.active = self.confidence >= thr;
    }

    fn reset_learning_state(&mut self, p: &Params) {
        self.ltp_timer = 0;
        self.ltd_timer = 0;
        self.eligible_for_ltp = false;
        self.eligible_for_ltd = false;
        self.eligibility_ltp_timer = 0;
        self.eligibility_ltd_timer = 0;
        self.confidence_leak_timer = p.confidence_leak_period;
        self.reward_acceptor = true;
        self.penalty_acceptor = true;
        self.reward_inertia = 0;
        self.penalty_inertia = 0;
        self.ticks_since_ltp = 0;
    }
}

/// Dense integer-valued spiking network.
///
/// Neurons and outgoing synapse lists are parallel arrays; everything
/// references everything else by index, so there are no ownership cycles and
/// snapshotting is a flat walk.
pub struct SpikingNet {
    params: Params,
    pub neurons: Vec<Neuron>,
    pub connections: Vec<Vec<Synapse>>,
    pub global_tick: u64,
    rng: Prng,
}

impl SpikingNet {
    /// An unwired net. Call `build_topology` (or add synapses by hand) next.
    pub fn new(params: Params, seed: u64) -> Self {
        let neurons = (0..params.brain_size).map(|_| Neuron::new(&params)).collect();
        let connections = vec![Vec::new(); params.brain_size];
        Self {
            params,
            neurons,
            connections,
            global_tick: 0,
            rng: Prng::new(seed),
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn add_synapse(&mut self, source: NeuronId, target: NeuronId, confidence: i32, plastic: bool) {
        let syn = Synapse::new(target, confidence, plastic, &self.params);
        self.connections[source].push(syn);
    }

    /// Directional wiring constraints shared by construction and rewiring.
    /// Callers only offer hidden indices (>= FIRST_FANOUT) for both ends.
    fn edge_allowed(i: NeuronId, j: NeuronId) -> bool {
        // Fan-out relays accept input from their dedicated sensor only.
        if is_fanout(j) {
            return false;
        }
        // Fan-in relays send to their motor only.
        if is_fanin(i) {
            return false;
        }
        // The fixed first layer is never wired to itself.
        if i < FIRST_FREE_HIDDEN && j < FIRST_FREE_HIDDEN {
            return false;
        }
        true
    }

    fn incoming_count(&self, target: NeuronId) -> usize {
        self.connections
            .iter()
            .flat_map(|row| row.iter())
            .filter(|syn| syn.target == target)
            .count()
    }

    /// Wire the shipped topology: fixed sensor/motor layers plus sparse
    /// random plastic hidden-to-hidden links.
    pub fn build_topology(&mut self) {
        let p = self.params;

        // Fixed wires, exempt from plasticity: each sensor to its fan-out
        // relay, each fan-in relay to its motor.
        for s in 0..SENSOR_COUNT {
            self.add_synapse(s, FIRST_FANOUT + s, p.confidence_max, false);
        }
        self.add_synapse(FIRST_FANIN, MOTOR_LEFT, p.confidence_max, false);
        self.add_synapse(FIRST_FANIN + 1, MOTOR_RIGHT, p.confidence_max, false);

        let n = self.neurons.len();
        for i in FIRST_FANOUT..n {
            for j in FIRST_FANOUT..n {
                if i == j || !Self::edge_allowed(i, j) {
                    continue;
                }
                if self.rng.chance(p.connection_density) {
                    let conf = self.rng.gen_range_usize(
                        p.confidence_init_low as usize,
                        p.confidence_init_high as usize + 1,
                    ) as i32;
                    self.add_synapse(i, j, conf, true);
                }
            }
        }

        // Every motor must stay reachable: feed an unconnected fan-in relay
        // from a random free hidden neuron at the conduction threshold.
        for m in [FIRST_FANIN, FIRST_FANIN + 1] {
            if self.incoming_count(m) == 0 {
                let src = self.rng.gen_range_usize(FIRST_FREE_HIDDEN, 30);
                self.add_synapse(src, m, p.confidence_thr, true);
            }
        }
    }

    pub fn motor_spikes(&self) -> (bool, bool) {
        (
            self.neurons[MOTOR_LEFT].spiked_this_step,
            self.neurons[MOTOR_RIGHT].spiked_this_step,
        )
    }

    /// Advance the network by one tick.
    ///
    /// `external` carries this tick's external pulse count per neuron index
    /// (sensor drive and the injected background activity use the same
    /// path); missing entries mean zero. `reward_active` / `penalty_active`
    /// gate the plasticity arms for the whole tick.
    pub fn step(&mut self, external: &[u32], reward_active: bool, penalty_active: bool) {
        let p = self.params;
        self.global_tick += 1;

        // Highlights are valid for exactly one tick.
        for row in &mut self.connections {
            for syn in row {
                syn.highlighted = false;
            }
        }

        // Integrate and fire, in index order.
        for (idx, n) in self.neurons.iter_mut().enumerate() {
            n.spiked_this_step = false;

            if n.refractory_timer > 0 {
                n.refractory_timer -= 1;
                n.voltage = p.v_rest;
                n.input_buffer = 0;
                n.leak_timer = p.membrane_decay_period;
                continue;
            }

            let ext = external.get(idx).copied().unwrap_or(0);
            let mut saw_activity = n.input_buffer > 0 || ext > 0;

            n.voltage += n.input_buffer as i32;
            if ext > 0 {
                // An external pulse alone is enough to cross threshold.
                n.voltage += p.v_thresh;
            }
            n.input_buffer = 0;

            if n.voltage >= p.v_thresh {
                n.voltage = p.v_rest;
                n.spiked_this_step = true;
                n.refractory_timer = p.refractory_period;
                saw_activity = true;
            }

            if saw_activity {
                n.leak_timer = p.membrane_decay_period;
            } else if n.voltage > p.v_rest {
                n.leak_timer -= 1;
                if n.leak_timer == 0 {
                    n.voltage -= 1;
                    n.leak_timer = p.membrane_decay_period;
                }
            } else {
                n.leak_timer = p.membrane_decay_period;
            }
        }

        // Propagate and learn. The walk doubles as the scan for the pruning
        // candidate: the plastic synapse longest without an accepted LTP
        // pairing, ties broken by first encountered.
        let mut stalest: Option<(u64, NeuronId, usize)> = None;
        for i in 0..self.neurons.len() {
            let src_spiked = self.neurons[i].spiked_this_step;
            for s in 0..self.connections[i].len() {
                let syn = &mut self.connections[i][s];

                if src_spiked && syn.active {
                    let t = syn.target;
                    self.neurons[t].input_buffer += 1;
                    self.neurons[t].next_contributors.push(Contribution { from: i, syn: s });
                }

                if !syn.plastic {
                    continue;
                }

                syn.ticks_since_ltp += 1;

                if syn.ltp_timer > 0 {
                    syn.ltp_timer -= 1;
                }
                if syn.ltd_timer > 0 {
                    syn.ltd_timer -= 1;
                }

                if syn.reward_inertia > 0 {
                    syn.reward_inertia -= 1;
                    if syn.reward_inertia == 0 {
                        syn.reward_acceptor = true;
                    }
                }
                if syn.penalty_inertia > 0 {
                    syn.penalty_inertia -= 1;
                    if syn.penalty_inertia == 0 {
                        syn.penalty_acceptor = true;
                    }
                }

                if syn.eligibility_ltp_timer > 0 {
                    syn.eligibility_ltp_timer -= 1;
                    if syn.eligibility_ltp_timer == 0 {
                        syn.eligible_for_ltp = false;
                    }
                }
                if syn.eligibility_ltd_timer > 0 {
                    syn.eligibility_ltd_timer -= 1;
                    if syn.eligibility_ltd_timer == 0 {
                        syn.eligible_for_ltd = false;
                    }
                }

                // Pre spike arms the LTP trace; a still-warm LTD trace means
                // post fired recently, latching a post-before-pre pairing.
                if src_spiked {
                    syn.ltp_timer = p.spike_trace_window;
                    if syn.ltd_timer > 0 {
                        syn.eligible_for_ltd = true;
                        syn.eligibility_ltd_timer = p.eligibility_trace_window;
                    }
                }
                // Post spike arms the LTD trace; a still-warm LTP trace means
                // pre fired recently, latching a pre-before-post pairing.
                if self.neurons[syn.target].spiked_this_step {
                    syn.ltd_timer = p.spike_trace_window;
                    if syn.ltp_timer > 0 {
                        syn.eligible_for_ltp = true;
                        syn.eligibility_ltp_timer = p.eligibility_trace_window;
                    }
                }

                // Reward wins over penalty; within an arm LTP wins over LTD;
                // at most one confidence move per synapse per tick.
                let mut modified = false;
                if reward_active && syn.reward_acceptor {
                    if syn.eligible_for_ltp {
                        // Counts as reinforced even when already at the cap.
                        syn.ticks_since_ltp = 0;
                    }
                    if syn.eligible_for_ltp && syn.confidence < p.confidence_max {
                        syn.confidence += 1;
                        syn.refresh_active(p.confidence_thr);
                        syn.eligible_for_ltp = false;
                        syn.eligibility_ltp_timer = 0;
                        syn.confidence_leak_timer = p.confidence_leak_period;
                        modified = true;
                    } else if syn.eligible_for_ltd && syn.confidence > 0 {
                        syn.confidence -= 1;
                        syn.refresh_active(p.confidence_thr);
                        syn.eligible_for_ltd = false;
                        syn.eligibility_ltd_timer = 0;
                        syn.confidence_leak_timer = p.confidence_leak_period;
                        modified = true;
                    }
                    if modified {
                        syn.penalty_acceptor = false;
                        syn.penalty_inertia = p.reinforcement_inertia_period;
                    }
                } else if penalty_active && syn.penalty_acceptor {
                    if syn.eligible_for_ltp && syn.confidence > 0 {
                        // Penalty after a pre-then-post pairing weakens the
                        // path that was just effective.
                        syn.confidence -= 1;
                        syn.refresh_active(p.confidence_thr);
                        syn.eligible_for_ltp = false;
                        syn.eligibility_ltp_timer = 0;
                        syn.confidence_leak_timer = p.confidence_leak_period;
                        modified = true;
                    }
                    // LTD + penalty is ignored per user request, but the
                    // pending eligibility does not survive it.
                    if syn.eligible_for_ltd {
                        syn.eligible_for_ltd = false;
                        syn.eligibility_ltd_timer = 0;
                    }
                    if modified {
                        syn.reward_acceptor = false;
                        syn.reward_inertia = p.reinforcement_inertia_period;
                    }
                }

                // Slow forgetting: confidence halves when the leak period
                // elapses without a reinforcement touching it.
                if syn.confidence_leak_timer > 0 {
                    syn.confidence_leak_timer -= 1;
                }
                if syn.confidence_leak_timer == 0 {
                    syn.confidence >>= 1;
                    syn.refresh_active(p.confidence_thr);
                    syn.confidence_leak_timer = p.confidence_leak_period;
                }

                let stale = syn.ticks_since_ltp;
                if stalest.map_or(true, |(w, _, _)| stale > w) {
                    stalest = Some((stale, i, s));
                }
            }
        }

        // Periodic rewiring of the stalest plastic synapse.
        if self.global_tick % p.pruning_period == 0 {
            if let Some((_, src, s)) = stalest {
                self.rewire(src, s);
            }
        }

        // Mark the synapse chains behind each motor spike, reading the
        // pre-shift histories: history index d still means "delivered d
        // ticks before this one".
        causality::highlight_motor_chains(&self.neurons, &mut self.connections);

        // Histories age by one tick; this tick's events move into slot 0.
        for n in &mut self.neurons {
            n.contrib_history.rotate_right(1);
            n.contrib_history[0] = std::mem::take(&mut n.next_contributors);
            n.spike_history.rotate_right(1);
            n.spike_history[0] = n.spiked_this_step;
        }

        #[cfg(debug_assertions)]
        self.assert_invariants();
    }

    /// Retarget one plastic synapse and restart its learning state.
    ///
    /// The new target is drawn uniformly from the hidden indices admissible
    /// under the construction-time constraints, excluding everything this
    /// source already reaches. A candidate that is the sole feeder of a
    /// motor relay keeps its target so the motor stays reachable.
    fn rewire(&mut self, src: NeuronId, s: usize) {
        let current = self.connections[src][s].target;

        let forced = is_fanin(current) && self.incoming_count(current) == 1;
        let new_target = if forced {
            current
        } else {
            let n = self.neurons.len();
            let mut candidates: Vec<NeuronId> = Vec::new();
            for j in FIRST_FANOUT..n {
                if j == src || !Self::edge_allowed(src, j) {
                    continue;
                }
                if self.connections[src].iter().any(|syn| syn.target == j) {
                    continue;
                }
                candidates.push(j);
            }
            if candidates.is_empty() {
                // Nothing admissible; leave the candidate untouched.
                return;
            }
            candidates[self.rng.gen_range_usize(0, candidates.len())]
        };

        let p = self.params;
        let syn = &mut self.connections[src][s];
        syn.target = new_target;
        syn.confidence = 1;
        syn.refresh_active(p.confidence_thr);
        syn.reset_learning_state(&p);
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        for row in &self.connections {
            for syn in row {
                assert!(
                    syn.confidence >= 0 && syn.confidence <= self.params.confidence_max,
                    "confidence {} out of range",
                    syn.confidence
                );
                assert_eq!(syn.active, syn.confidence >= self.params.confidence_thr);
            }
        }
        for n in &self.neurons {
            if n.refractory_timer > 0 {
                // Deliveries may still land in a refractory neuron's buffer;
                // they are discarded at its next integration. Voltage is
                // pinned to rest throughout.
                assert_eq!(n.voltage, self.params.v_rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::Prng;

    fn bare_net(size: usize) -> SpikingNet {
        let params = Params {
            brain_size: size,
            ..Params::default()
        };
        SpikingNet::new(params, 7)
    }

    fn pulse(size: usize, idx: NeuronId) -> Vec<u32> {
        let mut v = vec![0; size];
        v[idx] = 1;
        v
    }

    #[test]
    fn isolated_neuron_fires_and_recovers() {
        let mut net = bare_net(1);
        let mut rng = Prng::new(99);

        let mut spikes = 0;
        for _ in 0..200 {
            let ext = if rng.coin_flip() { vec![1] } else { vec![0] };
            net.step(&ext, false, false);
            if net.neurons[0].spiked_this_step {
                spikes += 1;
                if spikes == 3 {
                    break;
                }
            }
        }

        assert_eq!(spikes, 3);
        let n = &net.neurons[0];
        assert_eq!(n.voltage, net.params.v_rest);
        assert!(n.refractory_timer <= net.params.refractory_period);
    }

    #[test]
    fn external_pulse_fires_sensor_and_feeds_fanout() {
        let mut net = bare_net(36);
        net.build_topology();

        net.step(&pulse(36, 0), false, false);

        assert!(net.neurons[0].spike_history[0]);
        assert_eq!(net.neurons[FIRST_FANOUT].input_buffer, 1);
        assert_eq!(
            net.neurons[FIRST_FANOUT].contrib_history[0],
            vec![Contribution { from: 0, syn: 0 }]
        );

        // The relay integrates the delivery next tick but a single unit
        // stays below threshold.
        net.step(&[], false, false);
        assert_eq!(net.neurons[FIRST_FANOUT].voltage, 1);
        assert!(!net.neurons[FIRST_FANOUT].spiked_this_step);
    }

    #[test]
    fn inactive_synapse_delivers_nothing() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 0, true);
        assert!(!net.connections[12][0].active);

        net.step(&pulse(36, 12), false, false);

        assert!(net.neurons[12].spike_history[0]);
        assert_eq!(net.neurons[13].input_buffer, 0);
        assert!(net.neurons[13].contrib_history[0].is_empty());
    }

    #[test]
    fn resting_tick_changes_only_slow_timers() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 3, true);

        let leak_before = net.connections[12][0].confidence_leak_timer;
        net.step(&[], false, false);

        for n in &net.neurons {
            assert_eq!(n.voltage, 0);
            assert_eq!(n.input_buffer, 0);
            assert!(!n.spiked_this_step);
            assert_eq!(n.leak_timer, net.params.membrane_decay_period);
        }
        let syn = &net.connections[12][0];
        assert_eq!(syn.confidence, 3);
        assert!(syn.active);
        assert!(!syn.eligible_for_ltp && !syn.eligible_for_ltd);
        assert_eq!(syn.confidence_leak_timer, leak_before - 1);
    }

    #[test]
    fn pre_before_post_then_reward_increments_confidence() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 1, true);

        net.step(&[], false, false); // t=1
        net.step(&pulse(36, 12), false, false); // t=2: pre spikes
        net.step(&[], false, false); // t=3
        net.step(&pulse(36, 13), false, false); // t=4: post spikes
        assert!(net.connections[12][0].eligible_for_ltp);

        net.step(&[], true, false); // t=5: reward

        let syn = &net.connections[12][0];
        assert_eq!(syn.confidence, 2);
        assert!(syn.active);
        assert!(!syn.eligible_for_ltp);
        assert_eq!(syn.ticks_since_ltp, 0);
        assert!(!syn.penalty_acceptor);
        assert_eq!(syn.penalty_inertia, net.params.reinforcement_inertia_period);
        assert!(syn.reward_acceptor);
    }

    #[test]
    fn post_before_pre_then_penalty_changes_nothing() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 3, true);

        net.step(&[], false, false); // t=1
        net.step(&pulse(36, 13), false, false); // t=2: post spikes
        net.step(&[], false, false); // t=3
        net.step(&pulse(36, 12), false, false); // t=4: pre spikes
        assert!(net.connections[12][0].eligible_for_ltd);

        net.step(&[], false, true); // t=5: penalty

        let syn = &net.connections[12][0];
        assert_eq!(syn.confidence, 3);
        assert!(syn.reward_acceptor && syn.penalty_acceptor);
        assert_eq!(syn.reward_inertia, 0);
        // The pairing itself is consumed.
        assert!(!syn.eligible_for_ltd);
        assert_eq!(syn.eligibility_ltd_timer, 0);
    }

    #[test]
    fn reward_at_cap_still_counts_as_reinforcement() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 5, true);

        net.step(&pulse(36, 12), false, false);
        net.step(&pulse(36, 13), false, false);
        assert!(net.connections[12][0].eligible_for_ltp);
        let stale_before = net.connections[12][0].ticks_since_ltp;
        assert!(stale_before > 0);

        net.step(&[], true, false);

        let syn = &net.connections[12][0];
        assert_eq!(syn.confidence, 5);
        assert_eq!(syn.ticks_since_ltp, 0);
        // No modification happened, so no lockout either.
        assert!(syn.penalty_acceptor);
    }

    #[test]
    fn acceptor_state_mirrors_inertia_under_constant_reward() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 1, true);
        let mut rng = Prng::new(4242);

        for _ in 0..5000 {
            let mut ext = vec![0; 36];
            if rng.coin_flip() {
                ext[12] = 1;
            }
            if rng.coin_flip() {
                ext[13] = 1;
            }
            net.step(&ext, true, false);

            let syn = &net.connections[12][0];
            assert!(syn.confidence >= 0 && syn.confidence <= 5);
            assert_eq!(syn.active, syn.confidence >= 1);
            assert_eq!(syn.reward_acceptor, syn.reward_inertia == 0);
            assert_eq!(syn.penalty_acceptor, syn.penalty_inertia == 0);
        }
    }

    #[test]
    fn topology_respects_directional_constraints() {
        for seed in [1u64, 2, 3, 4, 5] {
            let mut net = SpikingNet::new(Params::default(), seed);
            net.build_topology();

            for (i, row) in net.connections.iter().enumerate() {
                for syn in row {
                    assert!(!is_sensor(syn.target), "sensor {} is a target", syn.target);
                    if is_motor(syn.target) {
                        // Only the fixed relay wires reach a motor.
                        assert!(!syn.plastic);
                        assert_eq!(syn.target - MOTOR_LEFT, i - FIRST_FANIN);
                    }
                    if syn.plastic {
                        assert!(!is_fanout(syn.target));
                        assert!(!is_fanin(i));
                        assert!(i >= FIRST_FREE_HIDDEN || syn.target >= FIRST_FREE_HIDDEN);
                        assert!(syn.confidence >= 1 && syn.confidence <= 5);
                    } else {
                        assert_eq!(syn.confidence, 5);
                    }
                }
            }

            // Sensors own exactly their fixed fan-out wire.
            for s in 0..SENSOR_COUNT {
                assert_eq!(net.connections[s].len(), 1);
                assert_eq!(net.connections[s][0].target, FIRST_FANOUT + s);
            }

            // Both motors and both relays stay reachable.
            assert!(net.incoming_count(MOTOR_LEFT) == 1);
            assert!(net.incoming_count(MOTOR_RIGHT) == 1);
            assert!(net.incoming_count(FIRST_FANIN) >= 1);
            assert!(net.incoming_count(FIRST_FANIN + 1) >= 1);
        }
    }

    #[test]
    fn non_plastic_wires_never_change() {
        let mut net = bare_net(36);
        net.build_topology();

        for t in 0..1000u32 {
            let ext = pulse(36, (t % 4) as usize);
            net.step(&ext, t % 2 == 0, t % 2 == 1);
        }

        for row in &net.connections {
            for syn in row.iter().filter(|syn| !syn.plastic) {
                assert_eq!(syn.confidence, 5);
                assert!(syn.active);
                assert_eq!(syn.ticks_since_ltp, 0);
            }
        }
    }

    #[test]
    fn pruning_rewires_the_stalest_synapse() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 4, true);
        net.add_synapse(14, 15, 4, true);
        // Make the first synapse the stale one from the start.
        net.connections[12][0].ticks_since_ltp = 1000;

        for _ in 0..150 {
            net.step(&[], false, false);
        }
        assert_eq!(net.global_tick, 150);

        let syn = &net.connections[12][0];
        assert_ne!(syn.target, 13, "stale synapse was not retargeted");
        assert_ne!(syn.target, 12);
        assert!(!is_fanout(syn.target) && !is_sensor(syn.target) && !is_motor(syn.target));
        assert_eq!(syn.confidence, 1);
        assert!(syn.active);
        assert_eq!(syn.ticks_since_ltp, 0);
        assert_eq!(syn.ltp_timer, 0);
        assert_eq!(syn.eligibility_ltp_timer, 0);
        assert!(syn.reward_acceptor && syn.penalty_acceptor);
        assert_eq!(syn.confidence_leak_timer, net.params.confidence_leak_period);

        // The fresher synapse kept its wiring.
        assert_eq!(net.connections[14][0].target, 15);
        assert_eq!(net.connections[14][0].confidence, 4);
    }

    #[test]
    fn sole_motor_feeder_is_never_retargeted_away() {
        let mut net = bare_net(36);
        net.add_synapse(12, FIRST_FANIN, 4, true);

        for _ in 0..150 {
            net.step(&[], false, false);
        }

        let syn = &net.connections[12][0];
        assert_eq!(syn.target, FIRST_FANIN);
        // The learning state restarted anyway.
        assert_eq!(syn.confidence, 1);
        assert_eq!(syn.ticks_since_ltp, 0);
    }

    #[test]
    fn history_slots_map_to_ticks_ago() {
        let mut net = bare_net(36);
        net.add_synapse(12, 13, 5, true);

        net.step(&pulse(36, 12), false, false);
        net.step(&[], false, false);
        net.step(&[], false, false);

        let n = &net.neurons[13];
        assert_eq!(n.contrib_history[2], vec![Contribution { from: 12, syn: 0 }]);
        assert!(n.contrib_history[0].is_empty());
        assert!(n.contrib_history[1].is_empty());
        assert!(net.neurons[12].spike_history[2]);
        assert!(!net.neurons[12].spike_history[0]);
    }

    #[test]
    fn full_system_invariants_hold_over_long_run() {
        use crate::world::{TargetKind, World};

        let params = Params::default();
        let mut net = SpikingNet::new(params, 11);
        net.build_topology();
        let mut world = World::new(params.world_size, 13);
        let mut rng = Prng::new(17);

        let mut reward = true;
        let mut penalty = false;
        for t in 0..3000u64 {
            let sensors = world.sensors();
            let mut input = vec![0u32; params.brain_size];
            input[..SENSOR_COUNT].copy_from_slice(&sensors);
            if t % params.random_activity_period == 0 {
                input[rng.gen_range_usize(FIRST_FANOUT, params.brain_size)] += 1;
            }

            net.step(&input, reward, penalty);

            let (mut left, mut right) = net.motor_spikes();
            if left && right {
                left = false;
                right = false;
            }
            let out = world.update(left, right);
            reward = out.reward;
            penalty = out.penalty;

            for row in &net.connections {
                for syn in row {
                    assert!(syn.confidence >= 0 && syn.confidence <= params.confidence_max);
                    assert_eq!(syn.active, syn.confidence >= params.confidence_thr);
                    assert!(!is_sensor(syn.target));
                }
            }
            let lit: u32 = world.sensors().iter().sum();
            assert!(lit <= 1, "more than one sensor bit set");
            if world.target_kind == TargetKind::None {
                assert_eq!(lit, 0);
            }
        }
        assert_eq!(net.global_tick, 3000);
    }
}
