//! fbview — a paginated raster document viewer for the Linux framebuffer.
//!
//! The crate is split along its collaborator seams: [`doc`] renders pages
//! into pixel buffers, [`fb`] pushes pixel rows to the display, and
//! [`viewer`] holds everything in between — the sliding page window, the
//! page-space viewport and the navigation loop.

pub mod config;
pub mod doc;
pub mod fb;
pub mod viewer;
