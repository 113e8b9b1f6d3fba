/// Immutable knobs for one simulation run.
///
/// Everything is plain integers on purpose: neuron and synapse dynamics are
/// fully discrete, so a run is bit-for-bit reproducible from `seed` alone.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    // Neuron dynamics.
    pub v_thresh: i32,
    pub v_rest: i32,
    pub refractory_period: u32,
    pub membrane_decay_period: u32,

    // Synapse confidence and its plasticity windows.
    pub confidence_max: i32,
    pub confidence_thr: i32,
    pub spike_trace_window: u32,
    pub eligibility_trace_window: u32,
    pub confidence_leak_period: u32,

    // Lockout after an accepted reinforcement, in ticks.
    pub reinforcement_inertia_period: u32,

    // How often the stalest plastic synapse is retargeted.
    pub pruning_period: u64,

    // Embodiment.
    pub world_size: i32,
    pub brain_size: usize,

    // Wiring at construction time.
    pub connection_density: f32,
    pub confidence_init_low: i32,
    pub confidence_init_high: i32,

    // Background drive: `random_activity_count` spontaneous pulses into
    // random hidden neurons every `random_activity_period` ticks.
    pub random_activity_count: u32,
    pub random_activity_period: u64,

    // If set, makes wiring and world events reproducible for evaluation.
    pub seed: Option<u64>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            v_thresh: 2,
            v_rest: 0,
            refractory_period: 1,
            membrane_decay_period: 750,

            confidence_max: 5,
            confidence_thr: 1,
            spike_trace_window: 10,
            eligibility_trace_window: 100,
            confidence_leak_period: 5300,

            reinforcement_inertia_period: 10,
            pruning_period: 150,

            world_size: 60,
            brain_size: 36,

            connection_density: 0.1,
            confidence_init_low: 1,
            confidence_init_high: 5,

            random_activity_count: 1,
            random_activity_period: 5,

            seed: None,
        }
    }
}
