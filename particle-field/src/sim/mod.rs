// sim/ - Particle field simulation
//
// Pure state, no DOM. The host measures sprites, the container and the mount
// element and passes the sizes in; the field keeps offsets, speeds and the
// per-reset appearance, and marks which particles need restyling.
//
// Coordinates: `offset` is measured from the container's bottom edge, growing
// downward. A particle starts at `offset = height` (just below the bottom),
// rises by `speed` per frame and recycles once `offset <= -container.height`.

mod particle;

pub use particle::Particles;

use std::f64::consts::TAU;

use crate::config::FieldConfig;

const DEFAULT_SEED: u32 = 0xDEADBEEF;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Particle field world
pub struct Field {
    config: FieldConfig,
    particles: Particles,
    rng: u32,
}

impl Field {
    pub fn new(config: FieldConfig, seed: u32) -> Self {
        Self {
            config,
            particles: Particles::new(),
            // xorshift never leaves zero
            rng: if seed == 0 { DEFAULT_SEED } else { seed },
        }
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Build the pool from the loaded sprite sizes.
    ///
    /// Each slot picks a sprite uniformly, resets like a recycle, then gets a
    /// starting offset anywhere from above the container top down to the
    /// mount's bottom edge so the field starts already scattered. Without a
    /// mount element the pool stays empty.
    pub fn spawn(&mut self, sprites: &[Size], container: Size, mount_height: Option<f64>) {
        self.particles.clear();

        let Some(mount) = mount_height else {
            log::warn!("no #{} element, particle field left empty", crate::config::MOUNT_ID);
            return;
        };
        if sprites.is_empty() {
            log::warn!("no particle sprites loaded, particle field left empty");
            return;
        }

        let count = self.config.amount_of_particles;
        self.particles.reserve(count);

        for _ in 0..count {
            let sprite = ((rand(&mut self.rng) * sprites.len() as f64) as usize).min(sprites.len() - 1);
            let i = self.particles.push(sprite, sprites[sprite]);
            self.particles.reset(i, container.width, &self.config, &mut self.rng);

            let lo = -(container.height - mount);
            self.particles.offset[i] = rand(&mut self.rng) * (mount - lo) + lo;
            let sway = self.sway_at(i);
            self.particles.sway[i] = sway;
        }

        log::info!("spawned {} particles from {} sprites", count, sprites.len());
    }

    /// Advance every particle one frame.
    pub fn tick(&mut self, container: Size) {
        for i in 0..self.particles.len() {
            self.particles.advance(i);

            if self.particles.offset[i] <= -container.height {
                self.particles.reset(i, container.width, &self.config, &mut self.rng);
            }

            let sway = self.sway_at(i);
            self.particles.sway[i] = sway;
        }
    }

    /// Forget pending restyles once the host has applied them.
    pub fn clear_restyled(&mut self) {
        self.particles.restyled.fill(false);
    }

    fn sway_at(&self, i: usize) -> f64 {
        sway(
            self.particles.offset[i],
            self.particles.height[i],
            self.config.motion_period,
            self.config.motion_amplitude,
        )
    }
}

/// Horizontal sway for a particle at `offset`.
///
/// Phase advances `period` cycles per sprite-height travelled, so faster
/// particles sway faster. Zero-height sprites don't sway.
#[inline]
pub fn sway(offset: f64, height: f64, period: f64, amplitude: f64) -> f64 {
    if height <= 0.0 {
        return 0.0;
    }
    let position = (offset / height) * period;
    (position * TAU).sin() * amplitude
}

// Random number generator (xorshift32), uniform in [0, 1)
#[inline(always)]
pub fn rand(rng: &mut u32) -> f64 {
    *rng ^= *rng << 13;
    *rng ^= *rng >> 17;
    *rng ^= *rng << 5;
    (*rng >> 8) as f64 * (1.0 / 16777216.0)
}
