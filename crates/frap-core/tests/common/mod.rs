use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use frap_core::frame::{Calibration, Samples, Stack};
use frap_core::io::ser::SER_HEADER_SIZE;

/// Build a SER file header with configurable bit depth and color mode.
///
/// `color_id`: 0=MONO, 8..=11 Bayer, 100=RGB, 101=BGR
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: i32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&color_id.to_le_bytes());
    // LittleEndian = 0, which writers use for little-endian data
    buf.extend_from_slice(&0i32.to_le_bytes());
    buf.extend_from_slice(&(width as i32).to_le_bytes());
    buf.extend_from_slice(&(height as i32).to_le_bytes());
    buf.extend_from_slice(&(bit_depth as i32).to_le_bytes());
    buf.extend_from_slice(&(num_frames as i32).to_le_bytes());
    // Observer (40 bytes)
    let mut observer = [0u8; 40];
    observer[..7].copy_from_slice(b"Imaging");
    buf.extend_from_slice(&observer);
    // Instrument (40 bytes)
    let mut instrument = [0u8; 40];
    instrument[..8].copy_from_slice(b"Confocal");
    buf.extend_from_slice(&instrument);
    // Telescope (40 bytes)
    buf.extend_from_slice(&[0u8; 40]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Complete 16-bit mono SER file, with an optional timestamp trailer.
pub fn build_ser_u16(
    width: u32,
    height: u32,
    frames: &[Vec<u16>],
    timestamps: Option<&[u64]>,
) -> Vec<u8> {
    let mut buf = build_ser_header_full(width, height, 16, frames.len(), 0);
    for frame in frames {
        assert_eq!(frame.len(), (width * height) as usize);
        for &v in frame {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    if let Some(stamps) = timestamps {
        for &t in stamps {
            buf.extend_from_slice(&t.to_le_bytes());
        }
    }
    buf
}

/// Write bytes to a temporary `.ser` file.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    use std::io::Write;
    let mut f = tempfile::Builder::new()
        .suffix(".ser")
        .tempfile()
        .expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}

/// Seeded Gaussian noise via Box-Muller.
pub struct Noise {
    rng: StdRng,
    sigma: f64,
}

impl Noise {
    pub fn new(seed: u64, sigma: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            sigma,
        }
    }

    pub fn sample(&mut self) -> f64 {
        if self.sigma == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.random::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.rng.random::<f64>();
        self.sigma * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// A bleach spot: center (row, col), radius, bleach frame, depth and recovery rate.
#[derive(Clone, Copy, Debug)]
pub struct Spot {
    pub center: (f64, f64),
    pub radius: f64,
    pub frame: usize,
    /// Intensity right after the bleach.
    pub bleached: f64,
    pub koff: f64,
}

/// Synthetic FRAP experiment.
///
/// A bright disk ("cell") on a dark background; inside each spot the
/// intensity drops to `bleached` at the spot's frame and recovers as
/// `cell - (cell - bleached)·exp(-koff·(t - frame))`.
#[derive(Clone, Debug)]
pub struct FrapScene {
    pub width: usize,
    pub height: usize,
    pub frames: usize,
    pub background: f64,
    pub cell: f64,
    pub cell_radius: f64,
    pub spots: Vec<Spot>,
    pub noise_sigma: f64,
    pub seed: u64,
}

impl FrapScene {
    /// 64x64, 50 frames, one spot of radius 5 bleached at frame 10.
    pub fn single_spot() -> Self {
        Self {
            width: 64,
            height: 64,
            frames: 50,
            background: 100.0,
            cell: 1000.0,
            cell_radius: 26.0,
            spots: vec![Spot {
                center: (32.0, 32.0),
                radius: 5.0,
                frame: 10,
                bleached: 300.0,
                koff: 0.15,
            }],
            noise_sigma: 5.0,
            seed: 7,
        }
    }

    pub fn value(&self, frame: usize, row: usize, col: usize) -> f64 {
        let cy = self.height as f64 / 2.0;
        let cx = self.width as f64 / 2.0;
        let d2 = |c: (f64, f64)| {
            let dr = row as f64 - c.0;
            let dc = col as f64 - c.1;
            dr * dr + dc * dc
        };
        if d2((cy, cx)) > self.cell_radius * self.cell_radius {
            return self.background;
        }
        for spot in &self.spots {
            if frame >= spot.frame && d2(spot.center) <= spot.radius * spot.radius {
                let dt = (frame - spot.frame) as f64;
                return self.cell - (self.cell - spot.bleached) * (-spot.koff * dt).exp();
            }
        }
        self.cell
    }

    /// Noisy per-frame u16 images in raster order.
    pub fn frames_u16(&self) -> Vec<Vec<u16>> {
        let mut noise = Noise::new(self.seed, self.noise_sigma);
        (0..self.frames)
            .map(|f| {
                (0..self.height * self.width)
                    .map(|p| {
                        let v = self.value(f, p / self.width, p % self.width) + noise.sample();
                        v.round().clamp(0.0, u16::MAX as f64) as u16
                    })
                    .collect()
            })
            .collect()
    }

    pub fn stack(&self) -> Stack {
        Stack::new(
            self.width,
            self.height,
            self.frames,
            Samples::U16(self.frames_u16().concat()),
            Calibration::default(),
        )
        .expect("valid synthetic stack")
    }
}

/// Uniform stack of `frames` frames filled with `value`.
pub fn flat_stack(width: usize, height: usize, frames: usize, value: u16) -> Stack {
    Stack::new(
        width,
        height,
        frames,
        Samples::U16(vec![value; width * height * frames]),
        Calibration::default(),
    )
    .expect("valid flat stack")
}

/// Sample `f` at `t_j = j·dt` and add seeded noise.
pub fn noisy_trace(n: usize, dt: f64, sigma: f64, seed: u64, f: impl Fn(f64) -> f64) -> (Vec<f64>, Vec<f64>) {
    let mut noise = Noise::new(seed, sigma);
    let t: Vec<f64> = (0..n).map(|j| j as f64 * dt).collect();
    let y = t.iter().map(|&t| f(t) + noise.sample()).collect();
    (t, y)
}
