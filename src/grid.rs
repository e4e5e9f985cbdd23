/// Row-major flat square grid. No per-cell objects.
/// Both axes wrap (toroidal topology).
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    pub data: Vec<T>,
    size: usize,
}

/// Moore neighborhood offsets, dx outer, dy inner.
const MOORE: [(i64, i64); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1),           (0, 1),
    (1, -1),  (1, 0),  (1, 1),
];

impl<T: Copy + Default> Grid<T> {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![T::default(); size * size],
            size,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.size && y < self.size);
        y * self.size + x
    }

    /// Inverse of [`Grid::idx`].
    #[inline]
    pub fn coords(&self, i: usize) -> (usize, usize) {
        (i % self.size, i / self.size)
    }

    /// Wrap an arbitrary coordinate pair onto the torus.
    #[inline]
    pub fn wrap(&self, x: i64, y: i64) -> (usize, usize) {
        wrap_xy(x, y, self.size)
    }

    #[inline]
    pub fn get(&self, x: i64, y: i64) -> T {
        let (x, y) = self.wrap(x, y);
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: i64, y: i64, v: T) {
        let (x, y) = self.wrap(x, y);
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Overwrite every cell with `v`.
    pub fn fill(&mut self, v: T) {
        self.data.fill(v);
    }

    /// Deep copy of `other` into `self`, reusing the allocation.
    pub fn copy_from(&mut self, other: &Self) {
        debug_assert_eq!(self.size, other.size);
        self.data.copy_from_slice(&other.data);
    }

    /// Every `(x, y, value)`, row-major: y outer, x inner.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.data.iter().enumerate().map(|(i, &v)| {
            let (x, y) = self.coords(i);
            (x, y, v)
        })
    }

    pub fn for_each_cell(&self, mut f: impl FnMut(usize, usize, T)) {
        for (x, y, v) in self.cells() {
            f(x, y, v);
        }
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        self.data.iter().filter(|v| pred(v)).count()
    }

    /// 8-connected neighbors with wrapping on both axes.
    #[inline]
    pub fn neighbors_of(&self, x: i64, y: i64) -> [(usize, usize); 8] {
        neighbors8_torus(x, y, self.size)
    }
}

/// Wrap both coordinates modulo `size`.
#[inline]
pub fn wrap_xy(x: i64, y: i64, size: usize) -> (usize, usize) {
    let n = size as i64;
    (x.rem_euclid(n) as usize, y.rem_euclid(n) as usize)
}

/// 8-connected neighbors on a torus, in fixed order.
/// On tiny grids (size < 3) the same cell may appear more than once.
/// The centre is wrapped before offsetting, so any `i64` input is accepted.
pub fn neighbors8_torus(x: i64, y: i64, size: usize) -> [(usize, usize); 8] {
    let (cx, cy) = wrap_xy(x, y, size);
    let mut out = [(0usize, 0usize); 8];
    for (slot, (dx, dy)) in out.iter_mut().zip(MOORE) {
        *slot = wrap_xy(cx as i64 + dx, cy as i64 + dy, size);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_wrap_out_of_range_coordinates() {
        let mut g = Grid::<u8>::new(4);
        g.set(4, -1, 7);
        assert_eq!(g.get(0, 3), 7);
        assert_eq!(g.get(-4, 7), 7);
        assert_eq!(g.count(|&v| v == 7), 1);
    }

    #[test]
    fn cells_are_row_major_and_visit_everything_once() {
        let g = Grid::<u8>::new(3);
        let order: Vec<(usize, usize)> = g.cells().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(order.len(), 9);
        assert_eq!(&order[..4], &[(0, 0), (1, 0), (2, 0), (0, 1)]);
        assert_eq!(order[8], (2, 2));
    }

    #[test]
    fn neighbors_follow_fixed_order_and_wrap() {
        let g = Grid::<u8>::new(5);
        assert_eq!(
            g.neighbors_of(0, 0),
            [(4, 4), (4, 0), (4, 1), (0, 4), (0, 1), (1, 4), (1, 0), (1, 1)]
        );
    }

    #[test]
    fn neighbors_of_extreme_coordinates_wrap_without_overflow() {
        let g = Grid::<u8>::new(5);
        let (cx, cy) = g.wrap(i64::MAX, i64::MIN);
        assert_eq!(
            g.neighbors_of(i64::MAX, i64::MIN),
            g.neighbors_of(cx as i64, cy as i64)
        );
        assert_eq!(g.neighbors_of(i64::MIN, 0), g.neighbors_of(2, 0));
    }

    #[test]
    fn for_each_cell_visits_row_major_with_values() {
        let mut g = Grid::<u8>::new(2);
        g.set(1, 0, 5);
        g.set(0, 1, 6);
        let mut seen = Vec::new();
        g.for_each_cell(|x, y, v| seen.push((x, y, v)));
        assert_eq!(seen, vec![(0, 0, 0), (1, 0, 5), (0, 1, 6), (1, 1, 0)]);
    }

    #[test]
    fn neighbors_on_three_by_three_cover_every_other_cell() {
        let g = Grid::<u8>::new(3);
        let mut n = g.neighbors_of(1, 1).to_vec();
        n.sort_unstable();
        n.dedup();
        assert_eq!(n.len(), 8);
        assert!(!n.contains(&(1, 1)));
    }

    #[test]
    fn copy_from_does_not_alias() {
        let mut a = Grid::<u8>::new(2);
        let mut b = Grid::<u8>::new(2);
        a.set(1, 1, 3);
        b.copy_from(&a);
        a.set(1, 1, 9);
        assert_eq!(b.get(1, 1), 3);
    }
}
