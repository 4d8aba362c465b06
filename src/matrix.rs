use bevy::{
    log::{debug, info},
    math::{Rect, Vec2},
    prelude::Resource,
};

use crate::{
    bit::{Bit, BitValue},
    config::BitMatrixConfig,
    surface::{FrameScheduler, Surface},
};

/// The grid of bits and the per-frame orchestration around it.
#[derive(Resource, Debug)]
pub struct BitMatrix {
    config: BitMatrixConfig,
    rng: fastrand::Rng,
    /// logical size of the surface the grid was last fitted to
    size: Vec2,
    rows: usize,
    cols: usize,
    spacing: Vec2,
    margin: Vec2,
    /// indexed `[row][col]`
    bits: Vec<Vec<Bit>>,
    built: bool,
    stopped: bool,
    frame_count: u64,
}

impl BitMatrix {
    /// Creates an empty matrix. `config` is expected to be validated.
    pub fn new(config: BitMatrixConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            spacing: config.spacing(),
            margin: config.margin(),
            config,
            rng,
            size: Vec2::ZERO,
            rows: 0,
            cols: 0,
            bits: Vec::new(),
            built: false,
            stopped: false,
            frame_count: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &BitMatrixConfig {
        &self.config
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn spacing(&self) -> Vec2 {
        self.spacing
    }

    #[inline]
    pub fn margin(&self) -> Vec2 {
        self.margin
    }

    #[inline]
    pub fn bits(&self) -> &[Vec<Bit>] {
        &self.bits
    }

    #[inline]
    pub fn bit(&self, row: usize, col: usize) -> Option<&Bit> {
        self.bits.get(row).and_then(|r| r.get(col))
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// number of frames drawn so far
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Fills the matrix with as many bits as fit in `size`.
    pub fn build(&mut self, size: Vec2) {
        self.size = size;
        self.spacing = self.config.spacing();
        self.margin = self.config.margin();
        self.rows = fit(size.y, self.spacing.y);
        self.cols = fit(size.x, self.spacing.x);

        self.bits = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            self.push_row(row);
        }
        self.built = true;

        info!(
            "built {}x{} bit matrix for a {}x{} surface ({})",
            self.rows,
            self.cols,
            size.x,
            size.y,
            self.config.text.describe()
        );
    }

    /// Fits the matrix to a new surface size, keeping every bit that still fits where it is.
    pub fn resize(&mut self, size: Vec2) {
        if !self.built {
            return;
        }
        self.size = size;
        self.spacing = self.config.spacing();
        self.margin = self.config.margin();

        let new_rows = fit(size.y, self.spacing.y);
        let new_cols = fit(size.x, self.spacing.x);
        debug!(
            "resizing bit matrix from {}x{} to {}x{}",
            self.rows, self.cols, new_rows, new_cols
        );

        if new_rows < self.rows {
            self.remove_last_rows(self.rows - new_rows);
        } else {
            // new rows get the old column count, columns are reconciled below
            for row in self.rows..new_rows {
                self.push_row(row);
            }
        }

        if new_cols < self.cols {
            self.remove_last_columns(self.cols - new_cols);
        } else if new_cols > self.cols {
            for row in 0..self.bits.len() {
                for col in self.cols..new_cols {
                    let bit = self.new_bit(row, col);
                    self.bits[row].push(bit);
                }
            }
        }

        self.rows = new_rows;
        self.cols = new_cols;
    }

    /// Drops the last `count` rows.
    pub fn remove_last_rows(&mut self, count: usize) {
        let keep = self.bits.len().saturating_sub(count);
        self.bits.truncate(keep);
    }

    /// Drops the last `count` bits of every row.
    pub fn remove_last_columns(&mut self, count: usize) {
        for row in &mut self.bits {
            let keep = row.len().saturating_sub(count);
            row.truncate(keep);
        }
    }

    /// Stops the frame loop: the next frame neither draws nor schedules another one.
    pub fn stop(&mut self) {
        if !self.stopped {
            info!("stopping bit matrix after {} frames", self.frame_count);
        }
        self.stopped = true;
    }

    /// Draws one frame onto `surface` and re-arms `scheduler` unless stopped.
    pub fn render_frame<S, F>(&mut self, surface: &mut S, scheduler: &mut F)
    where
        S: Surface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if self.stopped {
            return;
        }

        let size = surface.logical_size();
        if size != self.size {
            self.resize(size);
        }

        surface.clear(Rect::from_corners(Vec2::ZERO, size));

        let Self {
            config, rng, bits, ..
        } = self;
        let policy = &config.bit_value;
        for bit in bits.iter_mut().flatten() {
            if policy.allows_switch(bit) {
                let prob = match bit.value() {
                    BitValue::Zero => policy.switch_to_zero_prob,
                    BitValue::One => policy.switch_to_one_prob,
                };
                if rng.f32() < prob {
                    bit.switch_value();
                }
            }
            bit.update_and_draw(surface, rng);
        }
        self.frame_count += 1;

        scheduler.schedule_next_frame();
    }

    fn push_row(&mut self, row: usize) {
        let bits: Vec<Bit> = (0..self.cols).map(|col| self.new_bit(row, col)).collect();
        self.bits.push(bits);
    }

    fn new_bit(&mut self, row: usize, col: usize) -> Bit {
        let position = Vec2::new(col as f32, row as f32) * self.spacing + self.margin;
        let value = if self.rng.f32() < self.config.bit_value.initial_zero_prob {
            BitValue::Zero
        } else {
            BitValue::One
        };
        Bit::new(value, position, &self.config.fade)
    }
}

/// How many cells of `spacing` fit in `length`. Degenerate lengths fit none.
#[inline]
fn fit(length: f32, spacing: f32) -> usize {
    if length > 0.0 && spacing > 0.0 {
        (length / spacing).floor() as usize
    } else {
        0
    }
}
