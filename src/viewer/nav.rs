//! Navigation controller: command dispatch, zoom/rotation/invert state,
//! marks, and the boundary-crossing re-navigation that turns page-by-page
//! loads into continuous scrolling.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use log::debug;

use crate::config::Config;
use crate::doc::{DocError, Document};
use crate::fb::{Display, DisplayError};
use crate::viewer::input::Command;
use crate::viewer::keymap::Op;
use crate::viewer::pagestore::{PageError, PageStore, RenderParams};
use crate::viewer::viewport::{Pinned, Viewport};

/// Page background for content-margin detection (white).
const BACKGROUND: u32 = 0x00ff_ffff;

#[derive(Clone, Copy)]
pub struct NavOptions {
    pub min_zoom: u32,
    pub max_zoom: u32,
    pub page_steps: u32,
    pub window_size: usize,
    pub zoom: u32,
    pub rotate: i32,
}

impl From<&Config> for NavOptions {
    fn from(c: &Config) -> Self {
        Self {
            min_zoom: c.min_zoom,
            max_zoom: c.max_zoom,
            page_steps: c.page_steps,
            window_size: c.window_size,
            zoom: c.zoom,
            rotate: c.rotate,
        }
    }
}

#[derive(Clone, Copy)]
struct Mark {
    page: usize,
    /// Row offset in zoom units, so jumps survive zoom changes.
    row: i32,
}

/// Per-session scalars: zoom, rotation, inversion, the goto anchor, marks.
struct Session {
    zoom: u32,
    zoom_def: u32,
    rotate: i32,
    invert: bool,
    numdiff: i64,
    marks: HashMap<char, Mark>,
}

/// What the event loop should do after a command.
#[derive(Default)]
pub struct Outcome {
    pub redraw: bool,
    pub quit: bool,
    pub status: Option<String>,
}

impl Outcome {
    fn redraw() -> Self {
        Self {
            redraw: true,
            ..Self::default()
        }
    }

    fn none() -> Self {
        Self::default()
    }

    fn status(msg: String) -> Self {
        Self {
            status: Some(msg),
            ..Self::default()
        }
    }
}

fn is_mark_symbol(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '\'' || c == '`'
}

pub struct Navigator<D: Document> {
    store: PageStore<D>,
    vp: Viewport,
    session: Session,
    opts: NavOptions,
    opener: Box<dyn Fn() -> Result<D, DocError>>,
    label: String,
}

impl<D: Document> Navigator<D> {
    pub fn new(
        doc: D,
        opener: Box<dyn Fn() -> Result<D, DocError>>,
        label: String,
        screen_rows: usize,
        screen_cols: usize,
        opts: NavOptions,
    ) -> Self {
        // Marks and scroll rescaling divide by zoom, so the bounds are
        // enforced here as well as at the config layer.
        let mut opts = opts;
        opts.min_zoom = opts.min_zoom.max(1);
        opts.max_zoom = opts.max_zoom.max(opts.min_zoom);
        let zoom = opts.zoom.clamp(opts.min_zoom, opts.max_zoom);
        Self {
            store: PageStore::new(doc, opts.window_size),
            vp: Viewport::new(screen_rows, screen_cols),
            session: Session {
                zoom,
                zoom_def: zoom,
                rotate: opts.rotate,
                invert: false,
                numdiff: 0,
                marks: HashMap::new(),
            },
            opts,
            opener,
            label,
        }
    }

    /// Load the initial window and center the view on it.
    pub fn start(&mut self, page: usize) -> Result<(), DocError> {
        if self.try_load(page as i64)? {
            self.vp.srow = self.vp.prow;
        }
        self.vp.scol = -self.vp.screen_cols / 2;
        Ok(())
    }

    pub fn current_page(&self) -> usize {
        self.store.current()
    }

    pub fn zoom(&self) -> u32 {
        self.session.zoom
    }

    pub fn viewport(&self) -> &Viewport {
        &self.vp
    }

    pub fn store(&self) -> &PageStore<D> {
        &self.store
    }

    pub fn compose(&self, display: &mut dyn Display) -> Result<(), DisplayError> {
        self.vp.compose(&self.store, display)
    }

    fn params(&self) -> RenderParams {
        RenderParams {
            zoom: self.session.zoom,
            rotate: self.session.rotate,
            invert: self.session.invert,
        }
    }

    /// Load the window at `target` if it is a valid page. Out-of-range is a
    /// silent no-op (deliberate: failed navigation must not disturb the
    /// visible window); renderer failure propagates.
    fn try_load(&mut self, target: i64) -> Result<bool, DocError> {
        if target < 1 {
            return Ok(false);
        }
        match self.store.load_window(target as usize, &self.params()) {
            Ok(geom) => {
                self.vp.reorigin(geom.rows, geom.cols);
                Ok(true)
            }
            Err(PageError::OutOfRange { page, count }) => {
                debug!("nav: target {page} outside [1, {count}], ignored");
                Ok(false)
            }
            Err(PageError::Doc(e)) => Err(e),
        }
    }

    /// Execute one decoded command.
    pub fn dispatch(&mut self, cmd: &Command) -> Result<Outcome, DocError> {
        use Op::*;

        let cur = self.store.current() as i64;
        let pages = self.store.page_count() as i64;
        let step = (self.vp.screen_rows / self.opts.page_steps as i32).max(1);
        let hstep = (self.vp.screen_cols / self.opts.page_steps as i32).max(1);

        // Commands that leave the screen alone.
        match cmd.op {
            Quit => {
                return Ok(Outcome {
                    quit: true,
                    ..Outcome::default()
                });
            }
            Info => return Ok(Outcome::status(self.info_line())),
            SetAnchor => {
                self.session.numdiff = cur - cmd.count_or(cur as u32) as i64;
                return Ok(Outcome::none());
            }
            ZoomDefault => {
                self.session.zoom_def = cmd.count_or(self.session.zoom);
                return Ok(Outcome::none());
            }
            SetMark => {
                if let Some(c) = cmd.arg {
                    self.set_mark(c);
                }
                return Ok(Outcome::none());
            }
            Sleep => {
                thread::sleep(Duration::from_secs(cmd.count_or(1) as u64));
                return Ok(Outcome::none());
            }
            Reload => return self.reload(),
            _ => {}
        }

        // Commands that move the window or the scroll offset.
        match cmd.op {
            NextPage => {
                if self.try_load(cur + cmd.count_or(1) as i64)? {
                    self.vp.srow = self.vp.prow;
                }
            }
            PrevPage => {
                if self.try_load(cur - cmd.count_or(1) as i64)? {
                    self.vp.srow = self.vp.prow;
                }
            }
            Goto => {
                self.set_mark('\'');
                let nd = self.session.numdiff;
                let target = if cmd.count > 0 {
                    cmd.count as i64 + nd
                } else {
                    pages
                };
                if self.try_load(target)? {
                    self.vp.srow = self.vp.prow;
                }
            }
            GotoAnchor => {
                self.session.numdiff = cur - cmd.count_or(cur as u32) as i64;
                self.set_mark('\'');
                if self.try_load(cur + self.session.numdiff)? {
                    self.vp.srow = self.vp.prow;
                }
            }
            ZoomSet => self.zoom_to(cmd.count_or(self.session.zoom_def))?,
            ZoomWidth => {
                let pcols = self.store.page_cols() as u32;
                if pcols > 0 {
                    self.zoom_to(self.session.zoom * self.vp.screen_cols as u32 / pcols)?;
                }
            }
            ZoomHeight => {
                let prows = self.store.page_rows() as u32;
                if prows > 0 {
                    self.zoom_to(self.session.zoom * self.vp.screen_rows as u32 / prows)?;
                }
            }
            ZoomMargins => {
                let (lm, rm) = (self.left_margin(), self.right_margin());
                if lm < rm {
                    let width = (self.vp.screen_cols - hstep) as u32;
                    self.zoom_to(self.session.zoom * width / (rm - lm) as u32)?;
                }
            }
            Rotate => {
                self.session.rotate = cmd.count as i32;
                if self.try_load(cur)? {
                    self.vp.srow = self.vp.prow;
                }
            }
            Invert => {
                self.session.invert = !self.session.invert;
                self.try_load(cur)?;
            }
            ScrollDown => self.vp.srow += step * cmd.count_or(1) as i32,
            ScrollUp => self.vp.srow -= step * cmd.count_or(1) as i32,
            ScrollRight => self.vp.scol += hstep * cmd.count_or(1) as i32,
            ScrollLeft => self.vp.scol -= hstep * cmd.count_or(1) as i32,
            ScreenDown => {
                self.vp.srow += self.vp.screen_rows * cmd.count_or(1) as i32 - step;
            }
            ScreenUp => {
                self.vp.srow -= self.vp.screen_rows * cmd.count_or(1) as i32 - step;
            }
            Top => self.vp.srow = self.vp.prow,
            Bottom => {
                self.vp.srow = self.vp.prow + self.store.page_rows() as i32 - self.vp.screen_rows;
            }
            Middle => {
                self.vp.srow = self.vp.prow + self.store.page_rows() as i32 / 2
                    - self.vp.screen_rows / 2;
            }
            CenterCols => self.vp.scol = -self.vp.screen_cols / 2,
            LeftEdge => self.vp.scol = self.vp.pcol,
            RightEdge => {
                self.vp.scol = self.vp.pcol + self.store.page_cols() as i32 - self.vp.screen_cols;
            }
            LeftMargin => {
                self.vp.scol = self.vp.pcol + self.left_margin() as i32 - hstep / 2;
            }
            RightMargin => {
                self.vp.scol = self.vp.pcol + self.right_margin() as i32 + hstep / 2
                    - self.vp.screen_cols;
            }
            JumpMark => {
                if let Some(c) = cmd.arg {
                    self.jump_mark(c, false)?;
                }
            }
            JumpMarkRow => {
                if let Some(c) = cmd.arg {
                    self.jump_mark(c, true)?;
                }
            }
            Redraw => {}
            // Handled above.
            Quit | Info | SetAnchor | ZoomDefault | SetMark | Sleep | Reload => {}
        }

        self.clamp_and_autopage()?;
        Ok(Outcome::redraw())
    }

    /// Clamp the scroll offsets; a vertical clamp pinned at a bound means
    /// the view ran off the window, so page across it and keep the reading
    /// direction seamless.
    fn clamp_and_autopage(&mut self) -> Result<(), DocError> {
        let cur = self.store.current() as i64;
        match self.vp.clamp_rows(self.store.page_rows()) {
            Pinned::Low => {
                if self.try_load(cur - 1)? {
                    self.vp.srow = self.vp.prow + self.store.page_rows() as i32;
                }
            }
            Pinned::High => {
                if self.try_load(cur + 1)? {
                    self.vp.srow = self.vp.prow;
                }
            }
            Pinned::None => {}
        }
        self.vp.clamp_cols(self.store.page_cols());
        Ok(())
    }

    /// Set `zoom` (clamped), re-render the window at the new resolution and
    /// rescale the scroll offset so the same spot stays on screen.
    fn zoom_to(&mut self, z: u32) -> Result<(), DocError> {
        let old = self.session.zoom.max(self.opts.min_zoom);
        self.session.zoom = z.clamp(self.opts.min_zoom, self.opts.max_zoom);
        debug!("nav: zoom {} -> {}", old, self.session.zoom);
        if self.try_load(self.store.current() as i64)? {
            self.vp.srow = self.vp.srow * self.session.zoom as i32 / old as i32;
        }
        Ok(())
    }

    fn set_mark(&mut self, c: char) {
        if is_mark_symbol(c) {
            self.session.marks.insert(
                c,
                Mark {
                    page: self.store.current(),
                    row: self.vp.srow / self.session.zoom as i32,
                },
            );
        }
    }

    /// Jump to a mark. The current position is first saved under `'`, so a
    /// second jump returns. `with_row` restores the saved row (rescaled to
    /// the current zoom); otherwise the view resets to the page top.
    fn jump_mark(&mut self, c: char, with_row: bool) -> Result<(), DocError> {
        let c = if c == '`' { '\'' } else { c };
        if !is_mark_symbol(c) {
            return Ok(());
        }
        let Some(mark) = self.session.marks.get(&c).copied() else {
            return Ok(());
        };
        // Capture the destination before `'` is overwritten below.
        let dst_row = mark.row * self.session.zoom as i32;
        self.set_mark('\'');
        if self.try_load(mark.page as i64)? {
            self.vp.srow = if with_row { dst_row } else { self.vp.prow };
        }
        Ok(())
    }

    fn reload(&mut self) -> Result<Outcome, DocError> {
        match (self.opener)() {
            Ok(doc) => {
                self.store.replace_doc(doc);
                let target = self.store.current().clamp(1, self.store.page_count().max(1));
                self.try_load(target as i64)?;
                Ok(Outcome::redraw())
            }
            Err(e) => {
                // A document is already on screen; degrade instead of dying.
                debug!("nav: reload failed: {e}");
                Ok(Outcome::status(format!("cannot reload {}: {e}", self.label)))
            }
        }
    }

    fn info_line(&self) -> String {
        format!(
            "FBVIEW:     file:{}  page:{}({})  zoom:{}%",
            self.label,
            self.store.current(),
            self.store.page_count(),
            self.session.zoom * 10
        )
    }

    /// Leftmost content column of the first window buffer: the minimum over
    /// all rows of the leading background run.
    fn left_margin(&self) -> usize {
        if self.store.loaded() == 0 {
            return self.store.page_cols();
        }
        scan_left_margin(
            self.store.buf(0),
            self.store.page_rows(),
            self.store.page_cols(),
        )
    }

    /// Rightmost content column of the first window buffer: the maximum over
    /// all rows of the last non-background column.
    fn right_margin(&self) -> usize {
        if self.store.loaded() == 0 {
            return 0;
        }
        scan_right_margin(
            self.store.buf(0),
            self.store.page_rows(),
            self.store.page_cols(),
        )
    }
}

fn scan_left_margin(buf: &[u32], rows: usize, cols: usize) -> usize {
    let mut ret = cols;
    for i in 0..rows {
        let mut j = 0;
        while j < ret && buf[i * cols + j] == BACKGROUND {
            j += 1;
        }
        ret = ret.min(j);
    }
    ret
}

fn scan_right_margin(buf: &[u32], rows: usize, cols: usize) -> usize {
    let mut ret = 0;
    for i in 0..rows {
        let mut j = cols.saturating_sub(1);
        while j > ret && buf[i * cols + j] == BACKGROUND {
            j -= 1;
        }
        ret = ret.max(j);
    }
    ret
}
