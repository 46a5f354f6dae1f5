// particle.rs - Rising sprite particles
//
// Structure-of-Arrays layout, one slot per visual. The pool size is fixed once
// spawned; recycling resets a slot in place.

use crate::config::FieldConfig;

use super::Size;

#[derive(Debug, Clone, Default)]
pub struct Particles {
    // Which loaded sprite this slot clones, and its measured size
    pub sprite: Vec<usize>,
    pub width: Vec<f64>,
    pub height: Vec<f64>,

    // Motion
    pub offset: Vec<f64>, // px below the container bottom, negative = above it
    pub speed: Vec<f64>,  // px per frame, upward
    pub sway: Vec<f64>,   // px, horizontal translation this frame

    // Appearance, resampled on reset only
    pub left: Vec<f64>,
    pub scale: Vec<f64>,
    pub opacity: Vec<f64>,

    // Appearance changed since the host last applied it
    pub restyled: Vec<bool>,
}

impl Particles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sprite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprite.is_empty()
    }

    pub fn clear(&mut self) {
        self.sprite.clear();
        self.width.clear();
        self.height.clear();
        self.offset.clear();
        self.speed.clear();
        self.sway.clear();
        self.left.clear();
        self.scale.clear();
        self.opacity.clear();
        self.restyled.clear();
    }

    pub fn reserve(&mut self, n: usize) {
        self.sprite.reserve(n);
        self.width.reserve(n);
        self.height.reserve(n);
        self.offset.reserve(n);
        self.speed.reserve(n);
        self.sway.reserve(n);
        self.left.reserve(n);
        self.scale.reserve(n);
        self.opacity.reserve(n);
        self.restyled.reserve(n);
    }

    /// Append a zeroed slot for `sprite`, returning its index.
    pub fn push(&mut self, sprite: usize, size: Size) -> usize {
        self.sprite.push(sprite);
        self.width.push(size.width);
        self.height.push(size.height);
        self.offset.push(0.0);
        self.speed.push(0.0);
        self.sway.push(0.0);
        self.left.push(0.0);
        self.scale.push(1.0);
        self.opacity.push(1.0);
        self.restyled.push(false);
        self.len() - 1
    }

    /// Re-enter from the bottom with fresh speed and appearance.
    ///
    /// `left` lets the sprite range from half off the left edge to half off
    /// the right edge of the container.
    pub fn reset(&mut self, i: usize, container_width: f64, config: &FieldConfig, rng: &mut u32) {
        let half = self.width[i] / 2.0;

        self.offset[i] = self.height[i];
        self.speed[i] = config.speed.sample(rng);
        self.left[i] = super::rand(rng) * container_width - half;
        self.scale[i] = config.scale.sample(rng);
        self.opacity[i] = config.opacity.sample(rng);
        self.restyled[i] = true;
    }

    #[inline]
    pub fn advance(&mut self, i: usize) {
        self.offset[i] -= self.speed[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Range;

    #[test]
    fn test_push_and_clear() {
        let mut p = Particles::new();
        assert_eq!(p.push(2, Size::new(4.0, 8.0)), 0);
        assert_eq!(p.push(0, Size::new(1.0, 1.0)), 1);
        assert_eq!(p.len(), 2);
        assert_eq!(p.sprite, vec![2, 0]);
        assert_eq!(p.height[0], 8.0);

        p.clear();
        assert!(p.is_empty());
        assert!(p.restyled.is_empty());
    }

    #[test]
    fn test_reset_fixed_ranges() {
        let config = FieldConfig {
            speed: Range::new(1.5, 1.5),
            scale: Range::new(0.75, 0.75),
            opacity: Range::new(0.85, 0.85),
            ..FieldConfig::default()
        };
        let mut p = Particles::new();
        let i = p.push(0, Size::new(40.0, 25.0));
        let mut rng = 99;
        p.reset(i, 400.0, &config, &mut rng);

        assert_eq!(p.offset[i], 25.0);
        assert_eq!(p.speed[i], 1.5);
        assert_eq!(p.scale[i], 0.75);
        assert_eq!(p.opacity[i], 0.85);
        assert!(p.left[i] >= -20.0 && p.left[i] < 380.0);
        assert!(p.restyled[i]);

        p.advance(i);
        p.advance(i);
        assert_eq!(p.offset[i], 22.0);
    }
}
