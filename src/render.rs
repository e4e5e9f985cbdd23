use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use rayon::prelude::*;

use crate::cell::{CellChange, CellState, ChangeObserver};
use crate::error::Result;
use crate::grid::Grid;

/// Cell colors, RGBA.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub initial: [u8; 4],
    pub sick: [u8; 4],
    pub immune: [u8; 4],
    pub dead: [u8; 4],
    /// 1px gutter between cells.
    pub gap: [u8; 4],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            initial: [0xEC, 0xEC, 0xEC, 255],
            sick: [0xAA, 0x39, 0x39, 255],
            immune: [0x96, 0x93, 0x20, 255],
            dead: [0x33, 0x33, 0x33, 255],
            gap: [0xFA, 0xFA, 0xFA, 255],
        }
    }
}

impl Palette {
    #[inline]
    pub fn color(&self, state: CellState) -> [u8; 4] {
        match state {
            CellState::Susceptible => self.initial,
            CellState::Infected { .. } => self.sick,
            CellState::Immune => self.immune,
            CellState::Dead => self.dead,
        }
    }
}

/// Pixel pitch per cell: small grids get big cells.
pub fn cell_pitch(size: usize) -> usize {
    match size {
        0..=120 => 10,
        121..=240 => 6,
        241..=360 => 4,
        _ => 2,
    }
}

/// RGBA frame buffer for a `size × size` grid.
///
/// Cell `(x, y)` occupies the square at `(x*pitch+1, y*pitch+1)` with side
/// `pitch-1`; the remaining row and column stay in the gap color.
pub struct Canvas {
    size: usize,
    pitch: usize,
    palette: Palette,
    pub rgba: Vec<u8>,
}

impl Canvas {
    pub fn new(size: usize, palette: Palette) -> Self {
        let pitch = cell_pitch(size);
        let mut canvas = Self {
            size,
            pitch,
            palette,
            rgba: Vec::new(),
        };
        canvas.clear();
        canvas
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Side length in pixels.
    pub fn width(&self) -> usize {
        self.size * self.pitch
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[inline]
    pub fn pixel(&self, px: usize, py: usize) -> [u8; 4] {
        let i = (py * self.width() + px) * 4;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }

    /// Every cell in the initial color, gutters in the gap color.
    pub fn clear(&mut self) {
        let w = self.width();
        let initial = self.palette.initial;
        self.rgba = vec![0u8; w * w * 4];
        self.paint_rows(|_, _| initial);
    }

    /// Paint every cell from `grid`. Resizes when the grid size changed.
    pub fn repaint(&mut self, grid: &Grid<CellState>) {
        if grid.size() != self.size {
            *self = Self::new(grid.size(), self.palette);
        }
        let palette = self.palette;
        self.paint_rows(|x, y| palette.color(grid.data[y * grid.size() + x]));
    }

    fn paint_rows(&mut self, color_of: impl Fn(usize, usize) -> [u8; 4] + Sync) {
        let w = self.width();
        if w == 0 {
            return;
        }
        let pitch = self.pitch;
        let gap = self.palette.gap;

        self.rgba
            .par_chunks_mut(w * 4)
            .enumerate()
            .for_each(|(py, row)| {
                let in_gap_row = py % pitch == 0;
                for px in 0..w {
                    let color = if in_gap_row || px % pitch == 0 {
                        gap
                    } else {
                        color_of(px / pitch, py / pitch)
                    };
                    row[px * 4..px * 4 + 4].copy_from_slice(&color);
                }
            });
    }

    /// Paint one cell's square.
    pub fn paint_cell(&mut self, x: usize, y: usize, state: CellState) {
        let color = self.palette.color(state);
        let w = self.width();
        let x0 = x * self.pitch + 1;
        let y0 = y * self.pitch + 1;
        for py in y0..y0 + self.pitch - 1 {
            let start = (py * w + x0) * 4;
            let end = start + (self.pitch - 1) * 4;
            for px in self.rgba[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&color);
            }
        }
    }

    /// Grid cell under pixel `(px, py)`, or `None` outside the canvas.
    pub fn cell_at(&self, px: f64, py: f64) -> Option<(usize, usize)> {
        let w = self.width() as f64;
        if !(0.0..w).contains(&px) || !(0.0..w).contains(&py) {
            return None;
        }
        let pitch = self.pitch as f64;
        Some(((px / pitch) as usize, (py / pitch) as usize))
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let w = self.width() as u32;
        PngEncoder::new(&mut buf).write_image(&self.rgba, w, w, image::ExtendedColorType::Rgba8)?;
        Ok(buf)
    }

    pub fn to_data_url(&self) -> Result<String> {
        let png = self.to_png()?;
        let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
        Ok(format!("data:image/png;base64,{}", b64))
    }

    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let w = self.width() as u32;
        image::save_buffer(path, &self.rgba, w, w, image::ColorType::Rgba8)?;
        Ok(())
    }
}

impl ChangeObserver for Canvas {
    fn on_change(&mut self, change: &CellChange) {
        self.paint_cell(change.x, change.y, change.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_shrinks_with_grid_size() {
        assert_eq!(cell_pitch(50), 10);
        assert_eq!(cell_pitch(120), 10);
        assert_eq!(cell_pitch(200), 6);
        assert_eq!(cell_pitch(300), 4);
        assert_eq!(cell_pitch(1000), 2);
    }

    #[test]
    fn cleared_canvas_has_gutters_and_initial_cells() {
        let c = Canvas::new(3, Palette::default());
        assert_eq!(c.width(), 30);
        assert_eq!(c.rgba.len(), 30 * 30 * 4);
        let p = Palette::default();
        assert_eq!(c.pixel(0, 0), p.gap);
        assert_eq!(c.pixel(10, 5), p.gap);
        assert_eq!(c.pixel(1, 1), p.initial);
        assert_eq!(c.pixel(29, 29), p.initial);
    }

    #[test]
    fn zero_sized_canvas_is_empty() {
        let mut c = Canvas::new(0, Palette::default());
        assert_eq!(c.width(), 0);
        assert!(c.rgba.is_empty());
        c.repaint(&Grid::new(0));
        assert_eq!(c.cell_at(0.0, 0.0), None);
    }

    #[test]
    fn change_paints_only_that_cell() {
        let mut c = Canvas::new(3, Palette::default());
        let p = Palette::default();
        c.on_change(&CellChange { x: 1, y: 2, state: CellState::Dead });
        assert_eq!(c.pixel(11, 21), p.dead);
        assert_eq!(c.pixel(19, 29), p.dead);
        assert_eq!(c.pixel(20, 20), p.gap);
        assert_eq!(c.pixel(21, 21), p.initial);
        assert_eq!(c.pixel(11, 11), p.initial);
    }

    #[test]
    fn repaint_matches_incremental_painting() {
        let mut grid = Grid::<CellState>::new(4);
        grid.set(0, 0, CellState::Immune);
        grid.set(3, 1, CellState::Infected { days_remaining: 2 });
        let mut full = Canvas::new(4, Palette::default());
        full.repaint(&grid);
        let mut incremental = Canvas::new(4, Palette::default());
        incremental.on_change(&CellChange { x: 0, y: 0, state: CellState::Immune });
        incremental.on_change(&CellChange {
            x: 3,
            y: 1,
            state: CellState::Infected { days_remaining: 2 },
        });
        assert_eq!(full.rgba, incremental.rgba);
    }

    #[test]
    fn repaint_resizes_to_grid() {
        let mut c = Canvas::new(3, Palette::default());
        c.repaint(&Grid::new(130));
        assert_eq!(c.size(), 130);
        assert_eq!(c.pitch(), 6);
        assert_eq!(c.rgba.len(), 780 * 780 * 4);
    }

    #[test]
    fn pixels_resolve_to_cells() {
        let c = Canvas::new(5, Palette::default());
        assert_eq!(c.cell_at(0.0, 0.0), Some((0, 0)));
        assert_eq!(c.cell_at(19.5, 40.0), Some((1, 4)));
        assert_eq!(c.cell_at(50.0, 1.0), None);
        assert_eq!(c.cell_at(-1.0, 1.0), None);
    }

    #[test]
    fn png_data_url_has_prefix() {
        let c = Canvas::new(2, Palette::default());
        let url = c.to_data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }
}
