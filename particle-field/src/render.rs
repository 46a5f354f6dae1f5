// render.rs - Encode particle state as inline CSS
//
// Two kinds of output per particle:
//   placement  - every frame: bottom offset + translateX sway
//   appearance - on spawn/recycle only: left, scale, opacity
//
// The encoder reuses one declaration buffer; the host applies it before the
// next call.

use crate::sim::Particles;

/// A single `property: value` pair.
pub type Declaration = (&'static str, String);

/// Full-bleed overlay behind all page content (`Number.MIN_SAFE_INTEGER`).
pub const OVERLAY_STYLE: [(&str, &str); 4] = [
    ("z-index", "-9007199254740991"),
    ("position", "absolute"),
    ("inset", "0"),
    ("overflow", "hidden"),
];

/// Every loaded sprite is positioned by the overlay.
pub const SPRITE_STYLE: [(&str, &str); 1] = [("position", "absolute")];

/// Set on the host body so the overlay's `inset: 0` resolves against it.
pub const HOST_POSITION: &str = "relative";

pub struct Encoder {
    out: Vec<Declaration>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Self { out: Vec::with_capacity(3) }
    }

    /// Per-frame position of particle `i`.
    pub fn placement(&mut self, particles: &Particles, i: usize) -> &[Declaration] {
        self.out.clear();
        self.out.push(("bottom", px(-particles.offset[i])));
        self.out.push(("transform", format!("translateX({})", px(particles.sway[i]))));
        &self.out
    }

    /// Appearance sampled at the last reset of particle `i`.
    pub fn appearance(&mut self, particles: &Particles, i: usize) -> &[Declaration] {
        self.out.clear();
        self.out.push(("left", px(particles.left[i])));
        self.out.push(("scale", particles.scale[i].to_string()));
        self.out.push(("opacity", particles.opacity[i].to_string()));
        &self.out
    }
}

#[inline]
fn px(v: f64) -> String {
    // no "-0px"
    if v == 0.0 { "0px".to_string() } else { format!("{v}px") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Size;

    fn one() -> Particles {
        let mut p = Particles::new();
        p.push(0, Size::new(10.0, 10.0));
        p
    }

    #[test]
    fn test_placement() {
        let mut p = one();
        p.offset[0] = -120.5;
        p.sway[0] = -3.25;

        let mut enc = Encoder::new();
        let decl = enc.placement(&p, 0);
        assert_eq!(decl[0], ("bottom", "120.5px".to_string()));
        assert_eq!(decl[1], ("transform", "translateX(-3.25px)".to_string()));
    }

    #[test]
    fn test_placement_at_bottom_edge() {
        let p = one();
        let mut enc = Encoder::new();
        let decl = enc.placement(&p, 0);
        assert_eq!(decl[0].1, "0px");
        assert_eq!(decl[1].1, "translateX(0px)");
    }

    #[test]
    fn test_appearance() {
        let mut p = one();
        p.left[0] = 42.0;
        p.scale[0] = 0.5;
        p.opacity[0] = 0.85;

        let mut enc = Encoder::new();
        let decl = enc.appearance(&p, 0);
        assert_eq!(
            decl,
            &[
                ("left", "42px".to_string()),
                ("scale", "0.5".to_string()),
                ("opacity", "0.85".to_string()),
            ]
        );
    }
}
