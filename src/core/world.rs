//! The 1-D track the agent lives on.
//!
//! The world is the other half of the learning loop: its distance gradient
//! is the only source of reward and penalty, so it belongs to the core even
//! though it knows nothing about neurons.

use crate::prng::Prng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    None,
    Food,
    Danger,
}

impl TargetKind {
    /// Wire code used by the snapshot record.
    pub fn code(self) -> u8 {
        match self {
            TargetKind::None => 0,
            TargetKind::Food => 1,
            TargetKind::Danger => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Outcome {
    pub reward: bool,
    pub penalty: bool,
}

#[derive(Debug)]
pub struct World {
    pub size: i32,
    pub agent_pos: i32,
    pub target_pos: i32,
    pub target_kind: TargetKind,
    pub target_timer: u32,
    pub food_eaten: u32,
    pub danger_hit: u32,
    rng: Prng,
}

impl World {
    pub fn new(size: i32, seed: u64) -> Self {
        Self {
            size,
            agent_pos: size / 2,
            target_pos: 0,
            target_kind: TargetKind::None,
            target_timer: 0,
            food_eaten: 0,
            danger_hit: 0,
            rng: Prng::new(seed),
        }
    }

    fn spawn_target(&mut self) {
        let choice = self.rng.gen_range_usize(0, 3);
        let lifetime = self.rng.gen_range_usize(3000, 5001) as u32;

        // A new episode always starts from the middle of the track.
        self.agent_pos = self.size / 2;

        match choice {
            0 => self.target_kind = TargetKind::Food,
            1 => self.target_kind = TargetKind::Danger,
            _ => self.target_kind = TargetKind::None,
        }

        if self.target_kind == TargetKind::None {
            // Idle stretches are kept short.
            self.target_timer = lifetime / 3;
        } else {
            self.target_timer = lifetime;
            self.target_pos = if self.rng.coin_flip() { 0 } else { self.size - 1 };
        }
    }

    /// Four sensor bits: FoodLeft, FoodRight, DangerLeft, DangerRight.
    /// Exactly one is set while a target exists.
    pub fn sensors(&self) -> [u32; 4] {
        let mut s = [0; 4];
        if self.target_kind == TargetKind::None {
            return s;
        }

        let is_left = self.target_pos < self.agent_pos;
        match self.target_kind {
            TargetKind::Food => s[if is_left { 0 } else { 1 }] = 1,
            TargetKind::Danger => s[if is_left { 2 } else { 3 }] = 1,
            TargetKind::None => unreachable!(),
        }
        s
    }

    pub fn distance(&self) -> i32 {
        if self.target_kind == TargetKind::None {
            0
        } else {
            (self.agent_pos - self.target_pos).abs()
        }
    }

    /// Apply one tick of motor output and score it against the distance
    /// gradient. Both motors at once must be cancelled by the caller
    /// before getting here.
    pub fn update(&mut self, move_left: bool, move_right: bool) -> Outcome {
        if self.target_timer == 0 {
            self.spawn_target();
        }

        let prev_dist = if self.target_kind == TargetKind::None {
            // Nothing to chase: drift back toward the centre.
            let mid = self.size / 2;
            if self.agent_pos < mid {
                self.agent_pos += 1;
            } else if self.agent_pos > mid {
                self.agent_pos -= 1;
            }
            None
        } else {
            Some((self.agent_pos - self.target_pos).abs())
        };

        if move_left {
            self.agent_pos -= 1;
        }
        if move_right {
            self.agent_pos += 1;
        }

        let mut out = Outcome::default();
        if let Some(prev) = prev_dist {
            let curr = (self.agent_pos - self.target_pos).abs();

            match self.target_kind {
                TargetKind::Food => {
                    if curr < prev {
                        out.reward = true;
                    } else if curr > prev {
                        out.penalty = true;
                    }
                }
                TargetKind::Danger => {
                    if curr > prev {
                        out.reward = true;
                    } else if curr < prev {
                        out.penalty = true;
                    }
                }
                TargetKind::None => {}
            }

            if curr == 0 {
                match self.target_kind {
                    TargetKind::Food => {
                        self.food_eaten += 1;
                        out.reward = true;
                        out.penalty = false;
                    }
                    TargetKind::Danger => {
                        self.danger_hit += 1;
                        out.penalty = true;
                        out.reward = false;
                    }
                    TargetKind::None => {}
                }
                // Collision recentres the agent; the target outlives it
                // until its timer runs out.
                self.agent_pos = self.size / 2;
            }
        }

        if self.target_timer > 0 {
            self.target_timer -= 1;
            if self.target_timer == 0 {
                self.target_kind = TargetKind::None;
            }
        }

        out
    }
}
