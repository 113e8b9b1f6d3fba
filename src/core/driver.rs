//! The outer simulation loop and its control surface.
//!
//! All simulation state is owned by the thread running [`Driver::run`]. The
//! host's command reader shares exactly four atomic values with it, read at
//! most once per tick between snapshot emission and integration, so commands
//! land on tick boundaries.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::params::Params;
use crate::prng::Prng;
use crate::snapshot::{RunStats, TickSnapshot};
use crate::substrate::{SpikingNet, FIRST_FANOUT, SENSOR_COUNT};
use crate::world::{TargetKind, World};

/// One parsed line of the host command protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Resume,
    Pause,
    Reset,
    Stop,
    Speed(u64),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let word = parts.next().ok_or_else(|| "empty command".to_string())?;

        let cmd = match word {
            "start" => Command::Start,
            "resume" => Command::Resume,
            "pause" => Command::Pause,
            "reset" => Command::Reset,
            "stop" => Command::Stop,
            "speed" => {
                let arg = parts.next().ok_or_else(|| "speed needs a value".to_string())?;
                let ms: i64 = arg
                    .parse()
                    .map_err(|_| format!("bad speed value: {arg:?}"))?;
                Command::Speed(ms.max(0) as u64)
            }
            other => return Err(format!("unknown command: {other:?}")),
        };
        Ok(cmd)
    }
}

/// The only state shared between the simulation thread and the command
/// reader. Everything else lives on the simulation thread.
pub struct ControlFlags {
    running: AtomicBool,
    paused: AtomicBool,
    reset: AtomicBool,
    delay_ms: AtomicU64,
}

impl ControlFlags {
    /// Boots paused at a human-watchable pace; the host sends `start`.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(true),
            reset: AtomicBool::new(false),
            delay_ms: AtomicU64::new(500),
        }
    }

    pub fn apply(&self, cmd: Command) {
        match cmd {
            Command::Start | Command::Resume => self.paused.store(false, Ordering::SeqCst),
            Command::Pause => self.paused.store(true, Ordering::SeqCst),
            Command::Reset => self.reset.store(true, Ordering::SeqCst),
            Command::Stop => self.stop(),
            Command::Speed(ms) => self.delay_ms.store(ms, Ordering::SeqCst),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn reset_requested(&self) -> bool {
        self.reset.load(Ordering::SeqCst)
    }

    fn clear_reset(&self) {
        self.reset.store(false, Ordering::SeqCst);
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.load(Ordering::SeqCst)
    }

    pub fn set_delay_ms(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst)
    }
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self::new()
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

/// A boundary in the outer simulation loop, surfaced so the host can log
/// why lives begin and end without the core knowing about logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeEvent {
    /// A fresh brain and world are about to start ticking.
    Started,
    /// The inner loop broke because a reset was requested; a rebuild
    /// follows. A stop-exit never produces this.
    ResetTriggered,
}

pub struct Driver {
    params: Params,
    flags: Arc<ControlFlags>,
}

impl Driver {
    pub fn new(params: Params, flags: Arc<ControlFlags>) -> Self {
        Self { params, flags }
    }

    /// Run lives of the brain until stopped. A `reset` drops the current
    /// brain and world entirely and rebuilds; nothing survives it.
    ///
    /// `emit` receives one complete snapshot per tick, before that tick's
    /// integration, so the host also sees the initial state. `notify`
    /// receives one [`LifeEvent`] per life boundary.
    pub fn run<F, G>(&self, mut emit: F, mut notify: G)
    where
        F: FnMut(&TickSnapshot),
        G: FnMut(LifeEvent),
    {
        let p = self.params;

        while self.flags.is_running() {
            notify(LifeEvent::Started);

            let seed = p.seed.unwrap_or_else(clock_seed);
            let mut net = SpikingNet::new(p, seed);
            net.build_topology();
            let mut world = World::new(p.world_size, seed ^ 0x57A7E);
            let mut activity_rng = Prng::new(seed ^ 0xD1CE);
            self.flags.clear_reset();

            let mut stats = RunStats::default();
            let mut tick: u64 = 0;

            loop {
                if !self.flags.is_running() || self.flags.reset_requested() {
                    break;
                }

                emit(&TickSnapshot::capture(tick, &net, &world, &stats));

                let mut delay = self.flags.delay_ms();
                if self.flags.is_paused() {
                    while self.flags.is_paused()
                        && self.flags.is_running()
                        && !self.flags.reset_requested()
                    {
                        thread::sleep(Duration::from_millis(100));
                    }
                    // Don't double-sleep on the tick that leaves a pause.
                    delay = 0;
                }
                if delay > 0 {
                    thread::sleep(Duration::from_millis(delay));
                }
                if !self.flags.is_running() || self.flags.reset_requested() {
                    break;
                }

                let sensors = world.sensors();
                let mut input = vec![0u32; p.brain_size];
                input[..SENSOR_COUNT].copy_from_slice(&sensors);

                // Spontaneous background drive keeps the hidden layer from
                // going silent between episodes.
                if p.random_activity_period > 0 && tick % p.random_activity_period == 0 {
                    for _ in 0..p.random_activity_count {
                        let idx = activity_rng.gen_range_usize(FIRST_FANOUT, p.brain_size);
                        input[idx] += 1;
                    }
                }

                net.step(&input, stats.reward, stats.penalty);

                let (mut left, mut right) = net.motor_spikes();
                if left && right {
                    left = false;
                    right = false;
                }

                let out = world.update(left, right);

                // The outcome gates plasticity on the next tick.
                stats.reward = out.reward;
                stats.penalty = out.penalty;
                if out.reward {
                    stats.reward_sum += 1;
                }
                if out.penalty {
                    stats.penalty_sum += 1;
                }
                match world.target_kind {
                    TargetKind::Food => stats.food_time += 1,
                    TargetKind::Danger => stats.danger_time += 1,
                    TargetKind::None => {}
                }

                tick += 1;
            }

            if self.flags.reset_requested() {
                notify(LifeEvent::ResetTriggered);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parsing_covers_the_protocol() {
        assert_eq!(Command::parse("start"), Ok(Command::Start));
        assert_eq!(Command::parse("resume"), Ok(Command::Resume));
        assert_eq!(Command::parse("pause"), Ok(Command::Pause));
        assert_eq!(Command::parse("reset"), Ok(Command::Reset));
        assert_eq!(Command::parse("stop"), Ok(Command::Stop));
        assert_eq!(Command::parse("speed 250"), Ok(Command::Speed(250)));
        // Negative delays clamp to zero.
        assert_eq!(Command::parse("speed -5"), Ok(Command::Speed(0)));

        assert!(Command::parse("").is_err());
        assert!(Command::parse("speed").is_err());
        assert!(Command::parse("speed fast").is_err());
        assert!(Command::parse("warp 9").is_err());
    }

    #[test]
    fn pause_is_idempotent() {
        let flags = ControlFlags::new();
        flags.apply(Command::Start);
        assert!(!flags.is_paused());

        flags.apply(Command::Pause);
        flags.apply(Command::Pause);
        assert!(flags.is_paused());

        flags.apply(Command::Resume);
        assert!(!flags.is_paused());
    }

    #[test]
    fn stop_clears_running() {
        let flags = ControlFlags::new();
        assert!(flags.is_running());
        flags.apply(Command::Stop);
        assert!(!flags.is_running());
    }

    #[test]
    fn driver_emits_one_snapshot_per_tick_then_stops() {
        let params = Params {
            seed: Some(21),
            ..Params::default()
        };
        let flags = Arc::new(ControlFlags::new());
        flags.apply(Command::Start);
        flags.set_delay_ms(0);

        let driver = Driver::new(params, Arc::clone(&flags));
        let mut ticks = Vec::new();
        let mut events = Vec::new();
        {
            let flags = Arc::clone(&flags);
            driver.run(
                |snap| {
                    ticks.push(snap.t);
                    assert_eq!(snap.neurons.len(), 36);
                    if ticks.len() == 5 {
                        flags.stop();
                    }
                },
                |event| events.push(event),
            );
        }

        assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
        // A stop-exit is not a reset.
        assert_eq!(events, vec![LifeEvent::Started]);
    }

    #[test]
    fn reset_rebuilds_from_tick_zero() {
        let params = Params {
            seed: Some(3),
            ..Params::default()
        };
        let flags = Arc::new(ControlFlags::new());
        flags.apply(Command::Start);
        flags.set_delay_ms(0);

        let driver = Driver::new(params, Arc::clone(&flags));
        let mut ticks = Vec::new();
        let mut events = Vec::new();
        {
            let flags = Arc::clone(&flags);
            driver.run(
                |snap| {
                    ticks.push(snap.t);
                    if ticks.len() == 3 {
                        flags.apply(Command::Reset);
                    }
                    if ticks.len() == 6 {
                        flags.stop();
                    }
                },
                |event| events.push(event),
            );
        }

        // Three ticks of the first life, then the rebuilt one starts over.
        assert_eq!(ticks, vec![0, 1, 2, 0, 1, 2]);
        // The first life ended in a reset, the second in a stop.
        assert_eq!(
            events,
            vec![
                LifeEvent::Started,
                LifeEvent::ResetTriggered,
                LifeEvent::Started,
            ]
        );
    }
}
