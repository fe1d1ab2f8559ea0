//! Page-space viewport: signed scroll offsets, window origin, row composition.
//!
//! Pages are stacked vertically in page-space, centered around the origin:
//! the window's top-left corner sits at `(-page_rows/2, -page_cols/2)`.
//! The scroll offset `(srow, scol)` is the page-space coordinate shown at
//! the screen's top-left corner.

use crate::doc::Document;
use crate::fb::{Display, DisplayError};
use crate::viewer::pagestore::PageStore;

/// Clamp tolerance: one unit of page content is always kept on screen.
pub const MARGIN: i32 = 1;

pub struct Viewport {
    pub screen_rows: i32,
    pub screen_cols: i32,
    /// Page-space coordinate of the window's top-left corner.
    pub prow: i32,
    pub pcol: i32,
    /// Page-space coordinate shown at the screen's top-left corner.
    pub srow: i32,
    pub scol: i32,
}

/// Which clamp bound, if any, the vertical scroll offset was pinned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pinned {
    None,
    /// Scrolled past the window start; caller may page backward.
    Low,
    /// Scrolled past the window end; caller may page forward.
    High,
}

impl Viewport {
    pub fn new(screen_rows: usize, screen_cols: usize) -> Self {
        Self {
            screen_rows: screen_rows as i32,
            screen_cols: screen_cols as i32,
            prow: 0,
            pcol: 0,
            srow: 0,
            scol: 0,
        }
    }

    /// Recenter the window origin for freshly loaded page dimensions.
    pub fn reorigin(&mut self, page_rows: usize, page_cols: usize) {
        self.prow = -(page_rows as i32) / 2;
        self.pcol = -(page_cols as i32) / 2;
    }

    /// Clamp the vertical scroll offset against the window span and report
    /// whether it was pinned at a bound (the auto-paging trigger).
    pub fn clamp_rows(&mut self, page_rows: usize) -> Pinned {
        let low = self.prow - self.screen_rows + MARGIN;
        let high = self.prow + page_rows as i32 - MARGIN;
        self.srow = self.srow.clamp(low, high.max(low));
        if self.srow == low {
            Pinned::Low
        } else if self.srow == high {
            Pinned::High
        } else {
            Pinned::None
        }
    }

    /// Clamp the horizontal scroll offset. No auto-paging sideways.
    pub fn clamp_cols(&mut self, page_cols: usize) {
        let low = self.pcol - self.screen_cols + MARGIN;
        let high = self.pcol + page_cols as i32 - MARGIN;
        self.scol = self.scol.clamp(low, high.max(low));
    }

    /// Compose every screen row from the resident window buffers and push
    /// it to the display.
    ///
    /// Slot `k` occupies the page-space rows
    /// `[prow + page_rows*k, prow + page_rows*(k+1))`; the horizontal
    /// overlap between screen and page is copied, the rest stays blank.
    pub fn compose<D: Document>(
        &self,
        store: &PageStore<D>,
        display: &mut dyn Display,
    ) -> Result<(), DisplayError> {
        let prows = store.page_rows() as i32;
        let pcols = store.page_cols() as i32;
        let mut rbuf = vec![0u32; self.screen_cols as usize];

        let cbeg = self.scol.max(self.pcol);
        let cend = (self.scol + self.screen_cols).min(self.pcol + pcols);

        for i in self.srow..self.srow + self.screen_rows {
            rbuf.fill(0);
            if cbeg < cend && prows > 0 {
                for k in 0..store.loaded() {
                    let top = self.prow + prows * k as i32;
                    if i >= top && i < top + prows {
                        let src_row = (i - top) as usize;
                        let sbeg = (cbeg - self.pcol) as usize;
                        let send = (cend - self.pcol) as usize;
                        let dbeg = (cbeg - self.scol) as usize;
                        let src = store.buf(k);
                        let base = src_row * pcols as usize;
                        rbuf[dbeg..dbeg + (send - sbeg)]
                            .copy_from_slice(&src[base + sbeg..base + send]);
                    }
                }
            }
            display.push_row((i - self.srow) as usize, 0, &rbuf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorigin_centers_page() {
        let mut vp = Viewport::new(40, 80);
        vp.reorigin(100, 60);
        assert_eq!((vp.prow, vp.pcol), (-50, -30));
    }

    #[test]
    fn clamp_rows_bounds() {
        let mut vp = Viewport::new(40, 80);
        vp.reorigin(100, 60);

        vp.srow = -1000;
        assert_eq!(vp.clamp_rows(100), Pinned::Low);
        assert_eq!(vp.srow, -50 - 40 + MARGIN);

        vp.srow = 1000;
        assert_eq!(vp.clamp_rows(100), Pinned::High);
        assert_eq!(vp.srow, -50 + 100 - MARGIN);

        vp.srow = -50;
        assert_eq!(vp.clamp_rows(100), Pinned::None);
        assert_eq!(vp.srow, -50);
    }

    #[test]
    fn clamp_cols_bounds() {
        let mut vp = Viewport::new(40, 80);
        vp.reorigin(100, 60);
        vp.scol = -1000;
        vp.clamp_cols(60);
        assert_eq!(vp.scol, -30 - 80 + MARGIN);
        vp.scol = 1000;
        vp.clamp_cols(60);
        assert_eq!(vp.scol, -30 + 60 - MARGIN);
    }
}
