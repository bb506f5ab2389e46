//! Hit particles
//!
//! Seeded so that replays of the same input produce the same bursts.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::types::{Color, Point};

/// Maximum speed per axis in pixels per step
const MAX_SPEED: f32 = 3.0;

/// Particle radius range in pixels
const MIN_RADIUS: f32 = 2.0;
const MAX_RADIUS: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub velocity: Point,
    pub radius: f32,
    pub color: Color,
    /// Steps left before removal
    pub remaining: u32,
    pub lifetime: u32,
}

impl Particle {
    /// Fade factor in `0..=1`
    pub fn alpha(&self) -> f32 {
        if self.lifetime == 0 {
            return 0.0;
        }
        self.remaining as f32 / self.lifetime as f32
    }
}

pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: ChaCha8Rng,
    per_burst: usize,
    lifetime: u32,
}

impl ParticleSystem {
    pub fn new(seed: u64, per_burst: usize, lifetime: u32) -> Self {
        Self {
            particles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            per_burst,
            lifetime: lifetime.max(1),
        }
    }

    /// Spawn a burst at `at`
    pub fn emit(&mut self, at: Point, color: Color) {
        self.particles.reserve(self.per_burst);
        for _ in 0..self.per_burst {
            let velocity = Point::new(
                self.rng.gen_range(-MAX_SPEED..=MAX_SPEED),
                self.rng.gen_range(-MAX_SPEED..=MAX_SPEED),
            );
            self.particles.push(Particle {
                position: at,
                velocity,
                radius: self.rng.gen_range(MIN_RADIUS..=MAX_RADIUS),
                color,
                remaining: self.lifetime,
                lifetime: self.lifetime,
            });
        }
    }

    /// Advance every particle one step and drop the dead ones
    pub fn step(&mut self) {
        for p in &mut self.particles {
            p.position = p.position + p.velocity;
            p.remaining = p.remaining.saturating_sub(1);
        }
        self.particles.retain(|p| p.remaining > 0);
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
