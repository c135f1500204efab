//! Demo inputs: test patterns, synthetic parameters, class labels.

use edgecnn_driver::fixed::to_fixed;
use std::fmt;

/// Conv0 3×3×3×16 plus Conv1 3×3×16×32.
pub const DEMO_WEIGHTS: usize = 432 + 4608;
/// Conv0 16 plus Conv1 32.
pub const DEMO_BIASES: usize = 16 + 32;

/// CIFAR-10 class names.
pub const CIFAR10_LABELS: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Display name for a class index.
pub fn label(class_id: usize) -> String {
    CIFAR10_LABELS
        .get(class_id)
        .map_or_else(|| format!("class {class_id}"), |l| (*l).to_string())
}

// ── PRNG ─────────────────────────────────────────────────────────────────────

/// xoshiro256++, seeded deterministically.
pub struct Xoshiro {
    s: [u64; 4],
}

impl Xoshiro {
    pub fn new(seed: u64) -> Self {
        let s = [
            seed ^ 0x9e37_79b9_7f4a_7c15,
            seed.wrapping_add(0x6c62_272e_07bb_0142),
            seed.rotate_left(17),
            seed.rotate_right(5),
        ];
        let mut rng = Self { s };
        for _ in 0..20 {
            rng.next_u64();
        }
        rng
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.s[0]
            .wrapping_add(self.s[3])
            .rotate_left(23)
            .wrapping_add(self.s[0]);
        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform in `[0, 1)`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_f32(&mut self) -> f32 {
        let bits = (self.next_u64() >> 41) as u32 | 0x3f80_0000;
        f32::from_bits(bits) - 1.0
    }

    /// Uniform byte.
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_u8(&mut self) -> u8 {
        (self.next_u64() >> 56) as u8
    }
}

/// Q8.8 values uniform in `[-half_range, half_range)`.
pub fn synthetic(rng: &mut Xoshiro, len: usize, half_range: f32) -> Vec<i16> {
    (0..len)
        .map(|_| to_fixed((rng.next_f32() * 2.0 - 1.0) * half_range))
        .collect()
}

/// Synthetic weights in `[-0.5, 0.5)`.
pub fn synthetic_weights(rng: &mut Xoshiro, len: usize) -> Vec<i16> {
    synthetic(rng, len, 0.5)
}

/// Synthetic biases in `[-0.125, 0.125)`.
pub fn synthetic_biases(rng: &mut Xoshiro, len: usize) -> Vec<i16> {
    synthetic(rng, len, 0.125)
}

// ── Test patterns ────────────────────────────────────────────────────────────

/// Test frame contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Pattern {
    /// Red ramps left to right, green top to bottom
    Gradient,
    /// 16-pixel black and white squares
    Checkerboard,
    /// Uniform random pixels
    Noise,
    /// Mid grey
    Solid,
}

impl Pattern {
    /// Cycle order used by streaming mode.
    pub const ALL: [Self; 4] = [Self::Gradient, Self::Checkerboard, Self::Noise, Self::Solid];
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gradient => "gradient",
            Self::Checkerboard => "checkerboard",
            Self::Noise => "noise",
            Self::Solid => "solid",
        };
        f.write_str(name)
    }
}

/// Channel-interleaved Q8.8 frame; 8-bit pixel `p` encodes as `p / 255`.
pub fn generate_frame(
    pattern: Pattern,
    width: usize,
    height: usize,
    channels: usize,
    rng: &mut Xoshiro,
) -> Vec<i16> {
    let mut frame = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let pixel = match pattern {
                    Pattern::Gradient => match c {
                        0 => x * 255 / width,
                        1 => y * 255 / height,
                        _ => 128,
                    },
                    Pattern::Checkerboard => {
                        if (x / 16 + y / 16) % 2 == 0 {
                            255
                        } else {
                            0
                        }
                    }
                    Pattern::Noise => usize::from(rng.next_u8()),
                    Pattern::Solid => 128,
                };
                #[allow(clippy::cast_precision_loss)]
                frame.push(to_fixed(pixel as f32 / 255.0));
            }
        }
    }
    frame
}
