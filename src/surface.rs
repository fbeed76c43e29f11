//! Dense row-major RGBA surface shared by [`crate::layer::Layer`] and
//! [`crate::frame::FrameBuffer`] (§3).

use crate::color::Color;

/// A nonnegative (row, col) coordinate, bounded by the owning surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub row: u16,
    pub col: u16,
}

impl Point {
    pub fn new(row: u16, col: u16) -> Self {
        Point { row, col }
    }
}

/// A dense (height, width) matrix of [`Color`]. Every cell starts as
/// transparent black. Height and width are both required to be nonzero.
#[derive(Debug, Clone)]
pub struct Surface {
    height: u16,
    width: u16,
    cells: Vec<Color>,
}

impl Surface {
    pub fn new(height: u16, width: u16) -> Self {
        assert!(height > 0 && width > 0, "surface dimensions must be nonzero");
        Surface {
            height,
            width,
            cells: vec![Color::TRANSPARENT; height as usize * width as usize],
        }
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    fn index(&self, row: u16, col: u16) -> Option<usize> {
        if row < self.height && col < self.width {
            Some(row as usize * self.width as usize + col as usize)
        } else {
            None
        }
    }

    pub fn get(&self, row: u16, col: u16) -> Option<Color> {
        self.index(row, col).map(|i| self.cells[i])
    }

    pub fn put(&mut self, row: u16, col: u16, color: Color) {
        if let Some(i) = self.index(row, col) {
            self.cells[i] = color;
        }
    }

    pub fn put_all(&mut self, cells: &[Color]) {
        let n = self.cells.len().min(cells.len());
        self.cells[..n].copy_from_slice(&cells[..n]);
    }

    /// Resets every cell to transparent black. Idempotent: calling twice in a
    /// row is observationally equal to calling once (§8).
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = Color::TRANSPARENT);
    }

    /// Fills every cell with `color`. Used when a layer declares a non-default
    /// background (§4.8).
    pub fn fill(&mut self, color: Color) {
        self.cells.iter_mut().for_each(|c| *c = color);
    }

    pub fn row(&self, row: u16) -> &[Color] {
        let start = row as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = ((u16, u16), Color)> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(i, c)| {
            let row = (i / width as usize) as u16;
            let col = (i % width as usize) as u16;
            ((row, col), *c)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_transparent_black() {
        let s = Surface::new(2, 3);
        for row in 0..2 {
            for col in 0..3 {
                assert_eq!(s.get(row, col), Some(Color::TRANSPARENT));
            }
        }
    }

    #[test]
    fn out_of_bounds_reads_return_none() {
        let s = Surface::new(2, 2);
        assert_eq!(s.get(5, 0), None);
        assert_eq!(s.get(0, 5), None);
    }

    #[test]
    fn double_clear_equals_single_clear() {
        let mut a = Surface::new(2, 2);
        a.put(0, 0, Color::WHITE);
        a.clear();
        let mut b = a.clone();
        b.clear();
        for ((r, c), color) in a.iter() {
            assert_eq!(color, b.get(r, c).unwrap());
        }
    }
}
