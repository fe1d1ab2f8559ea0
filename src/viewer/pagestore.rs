//! Sliding window of resident page buffers.
//!
//! Up to `window_size` consecutive pages are kept rendered at once; the
//! first slot is the current page. Stepping the window forward or backward
//! reuses the buffers that stay inside it and renders only the newly
//! exposed slots, which keeps single-page navigation (the dominant pattern)
//! down to one renderer call.

use log::debug;
use thiserror::Error;

use crate::doc::{DocError, Document};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("page {page} out of range [1, {count}]")]
    OutOfRange { page: usize, count: usize },
    #[error(transparent)]
    Doc(#[from] DocError),
}

/// Render settings applied to every buffer of one window load.
#[derive(Clone, Copy)]
pub struct RenderParams {
    pub zoom: u32,
    pub rotate: i32,
    pub invert: bool,
}

/// Dimensions of the freshly loaded window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowGeometry {
    pub rows: usize,
    pub cols: usize,
    pub loaded: usize,
}

struct PageBuf {
    page: usize,
    pixels: Vec<u32>,
}

pub struct PageStore<D> {
    doc: D,
    window_size: usize,
    bufs: Vec<PageBuf>,
    current: usize,
    page_rows: usize,
    page_cols: usize,
}

impl<D: Document> PageStore<D> {
    pub fn new(doc: D, window_size: usize) -> Self {
        Self {
            doc,
            window_size: window_size.max(1),
            bufs: Vec::new(),
            current: 0,
            page_rows: 0,
            page_cols: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        self.doc.page_count()
    }

    /// Current page number (first window slot), 0 before the first load.
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of resident buffers.
    pub fn loaded(&self) -> usize {
        self.bufs.len()
    }

    pub fn page_rows(&self) -> usize {
        self.page_rows
    }

    pub fn page_cols(&self) -> usize {
        self.page_cols
    }

    /// Pixels of window slot `k`.
    pub fn buf(&self, k: usize) -> &[u32] {
        &self.bufs[k].pixels
    }

    /// Page number held by window slot `k`.
    pub fn buf_page(&self, k: usize) -> usize {
        self.bufs[k].page
    }

    /// Swap in a reopened document. Resident buffers belong to the old
    /// document and are dropped; the next `load_window` renders fresh.
    pub fn replace_doc(&mut self, doc: D) {
        self.doc = doc;
        self.bufs.clear();
    }

    /// Slide the window so its first slot holds `target`.
    ///
    /// Out-of-range targets are rejected before any buffer is touched.
    /// A renderer failure mid-load is propagated; the caller treats it as
    /// fatal, so partially refreshed slots are never observed.
    pub fn load_window(
        &mut self,
        target: usize,
        params: &RenderParams,
    ) -> Result<WindowGeometry, PageError> {
        let count = self.doc.page_count();
        if target < 1 || target > count {
            return Err(PageError::OutOfRange {
                page: target,
                count,
            });
        }

        // The window shrinks rather than wraps at the document end.
        let lp = self.window_size.min(count - target + 1);
        let delta = target as i64 - self.current as i64;
        debug!(
            "pagestore: load target={target} current={} delta={delta} lp={lp}",
            self.current
        );

        if delta == 0 || self.bufs.is_empty() {
            // Same page (zoom/rotation/invert changed) or nothing resident:
            // every slot is rendered fresh.
            self.bufs.clear();
            for k in 0..lp {
                let buf = self.render_slot(target + k, params)?;
                self.bufs.push(buf);
            }
        } else if delta > 0 {
            // Moving forward: the head scrolls out, survivors shift left.
            let evicted = self.bufs.len().min(delta as usize);
            self.bufs.drain(..evicted);
            self.bufs.truncate(lp);
            while self.bufs.len() < lp {
                let k = self.bufs.len();
                let buf = self.render_slot(target + k, params)?;
                self.bufs.push(buf);
            }
        } else {
            // Moving backward: the tail scrolls out, survivors shift right.
            let back = (-delta) as usize;
            let surviving = lp.saturating_sub(back).min(self.bufs.len());
            self.bufs.truncate(surviving);
            for k in (0..lp.min(back)).rev() {
                let buf = self.render_slot(target + k, params)?;
                self.bufs.insert(0, buf);
            }
        }

        self.current = target;
        Ok(WindowGeometry {
            rows: self.page_rows,
            cols: self.page_cols,
            loaded: self.bufs.len(),
        })
    }

    fn render_slot(&mut self, page: usize, params: &RenderParams) -> Result<PageBuf, DocError> {
        let img = self.doc.render(page, params.zoom, params.rotate)?;
        let mut pixels = img.pixels;
        if params.invert {
            for px in &mut pixels {
                *px = !*px;
            }
        }
        // All buffers of one window share dimensions by renderer contract;
        // the last render call of this load wins.
        self.page_rows = img.rows;
        self.page_cols = img.cols;
        Ok(PageBuf { page, pixels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc::PageImage;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Renders each page as a 2x3 buffer filled with the page number, and
    /// counts render calls per page.
    struct CountingDoc {
        pages: usize,
        renders: Rc<RefCell<Vec<usize>>>,
    }

    impl Document for CountingDoc {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn render(&mut self, page: usize, _zoom: u32, _rotate: i32) -> Result<PageImage, DocError> {
            self.renders.borrow_mut().push(page);
            Ok(PageImage {
                pixels: vec![page as u32; 6],
                rows: 2,
                cols: 3,
            })
        }
    }

    fn store(pages: usize, window: usize) -> (PageStore<CountingDoc>, Rc<RefCell<Vec<usize>>>) {
        let renders = Rc::new(RefCell::new(Vec::new()));
        let doc = CountingDoc {
            pages,
            renders: Rc::clone(&renders),
        };
        (PageStore::new(doc, window), renders)
    }

    const PARAMS: RenderParams = RenderParams {
        zoom: 15,
        rotate: 0,
        invert: false,
    };

    #[test]
    fn first_load_renders_full_window() {
        let (mut s, renders) = store(10, 2);
        let geom = s.load_window(1, &PARAMS).unwrap();
        assert_eq!(geom, WindowGeometry { rows: 2, cols: 3, loaded: 2 });
        assert_eq!(*renders.borrow(), vec![1, 2]);
        assert_eq!(s.current(), 1);
        assert_eq!(s.buf_page(0), 1);
        assert_eq!(s.buf_page(1), 2);
    }

    #[test]
    fn forward_step_reuses_lookahead() {
        let (mut s, renders) = store(10, 2);
        s.load_window(1, &PARAMS).unwrap();
        renders.borrow_mut().clear();
        s.load_window(2, &PARAMS).unwrap();
        // Page 2 was already resident; only page 3 is rendered.
        assert_eq!(*renders.borrow(), vec![3]);
        assert_eq!(s.buf_page(0), 2);
        assert_eq!(s.buf_page(1), 3);
    }

    #[test]
    fn backward_step_renders_head_only() {
        let (mut s, renders) = store(10, 2);
        s.load_window(5, &PARAMS).unwrap();
        renders.borrow_mut().clear();
        s.load_window(4, &PARAMS).unwrap();
        assert_eq!(*renders.borrow(), vec![4]);
        assert_eq!(s.buf_page(0), 4);
        assert_eq!(s.buf_page(1), 5);
    }

    #[test]
    fn backward_jump_renders_everything_needed() {
        let (mut s, renders) = store(10, 2);
        s.load_window(8, &PARAMS).unwrap();
        renders.borrow_mut().clear();
        s.load_window(3, &PARAMS).unwrap();
        assert_eq!(*renders.borrow(), vec![4, 3]);
        assert_eq!(s.buf_page(0), 3);
        assert_eq!(s.buf_page(1), 4);
    }

    #[test]
    fn same_page_reloads_all() {
        let (mut s, renders) = store(10, 2);
        s.load_window(4, &PARAMS).unwrap();
        renders.borrow_mut().clear();
        s.load_window(4, &PARAMS).unwrap();
        assert_eq!(*renders.borrow(), vec![4, 5]);
    }

    #[test]
    fn window_shrinks_at_document_end() {
        let (mut s, _) = store(10, 2);
        assert_eq!(s.load_window(9, &PARAMS).unwrap().loaded, 2);
        let geom = s.load_window(10, &PARAMS).unwrap();
        assert_eq!(geom.loaded, 1);
        assert_eq!(s.buf_page(0), 10);
    }

    #[test]
    fn regrows_after_shrinking() {
        let (mut s, renders) = store(10, 2);
        s.load_window(10, &PARAMS).unwrap();
        renders.borrow_mut().clear();
        s.load_window(9, &PARAMS).unwrap();
        assert_eq!(s.loaded(), 2);
        assert_eq!(s.buf_page(0), 9);
        assert_eq!(s.buf_page(1), 10);
        // Page 10 survived; only page 9 was rendered.
        assert_eq!(*renders.borrow(), vec![9]);
    }

    #[test]
    fn out_of_range_leaves_state_untouched() {
        let (mut s, renders) = store(10, 2);
        s.load_window(5, &PARAMS).unwrap();
        renders.borrow_mut().clear();
        for bad in [0, 11, 99] {
            assert!(matches!(
                s.load_window(bad, &PARAMS),
                Err(PageError::OutOfRange { .. })
            ));
        }
        assert!(renders.borrow().is_empty());
        assert_eq!(s.current(), 5);
        assert_eq!(s.buf_page(0), 5);
        assert_eq!(s.buf_page(1), 6);
    }

    #[test]
    fn invert_complements_pixels() {
        let (mut s, _) = store(10, 1);
        let params = RenderParams {
            invert: true,
            ..PARAMS
        };
        s.load_window(3, &params).unwrap();
        assert_eq!(s.buf(0)[0], !3u32);
    }

    #[test]
    fn window_size_floor_is_one() {
        let (mut s, _) = store(10, 0);
        assert_eq!(s.load_window(1, &PARAMS).unwrap().loaded, 1);
    }
}
