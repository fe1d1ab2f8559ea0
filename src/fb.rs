//! Display collaborator: push composed pixel rows to a sink.
//!
//! [`LinuxFramebuffer`] writes straight to a framebuffer device. The stride
//! (`line_length`) is in bytes, not pixels, and panning offsets from the
//! variable screen info are honored.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("{path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: ioctl failed: {source}")]
    Ioctl {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("display is {bpp} bits per pixel, need 32")]
    FormatMismatch { bpp: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A fixed-size grid of pixels that accepts one row at a time.
pub trait Display {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    /// Write `pixels` (`0x00RRGGBB`) at `(row, start_col)`.
    fn push_row(&mut self, row: usize, start_col: usize, pixels: &[u32]) -> Result<(), DisplayError>;
}

const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

impl Default for FbFixScreeninfo {
    fn default() -> Self {
        // [u8; 16] has no Default past 0-init; zeroed is what the ioctl wants.
        unsafe { std::mem::zeroed() }
    }
}

/// Framebuffer device display (`/dev/fb0` and friends).
pub struct LinuxFramebuffer {
    file: File,
    rows: usize,
    cols: usize,
    line_length: u32,
    xoffset: u32,
    yoffset: u32,
    red_offset: u32,
    green_offset: u32,
    blue_offset: u32,
}

impl LinuxFramebuffer {
    /// Open and probe a framebuffer device. Fails before the first pixel is
    /// written if the device is not 32 bits per pixel.
    pub fn open(path: &Path) -> Result<Self, DisplayError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| DisplayError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut var = FbVarScreeninfo::default();
        let mut fix = FbFixScreeninfo::default();
        // SAFETY: fd is a valid open framebuffer device and both structs are
        // the kernel's fb_{var,fix}_screeninfo layouts.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), FBIOGET_VSCREENINFO, &mut var) };
        if rc < 0 {
            return Err(DisplayError::Ioctl {
                path: path.to_path_buf(),
                source: std::io::Error::last_os_error(),
            });
        }
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), FBIOGET_FSCREENINFO, &mut fix) };
        if rc < 0 {
            return Err(DisplayError::Ioctl {
                path: path.to_path_buf(),
                source: std::io::Error::last_os_error(),
            });
        }

        if var.bits_per_pixel != 32 {
            return Err(DisplayError::FormatMismatch {
                bpp: var.bits_per_pixel,
            });
        }

        info!(
            "fb: {} {}x{} stride {} offsets r{} g{} b{}",
            path.display(),
            var.xres,
            var.yres,
            fix.line_length,
            var.red.offset,
            var.green.offset,
            var.blue.offset
        );
        Ok(Self {
            file,
            rows: var.yres as usize,
            cols: var.xres as usize,
            line_length: fix.line_length,
            xoffset: var.xoffset,
            yoffset: var.yoffset,
            red_offset: var.red.offset,
            green_offset: var.green.offset,
            blue_offset: var.blue.offset,
        })
    }

    /// Repack a `0x00RRGGBB` pixel into the device's channel layout.
    fn pack(&self, px: u32) -> u32 {
        let r = (px >> 16) & 0xff;
        let g = (px >> 8) & 0xff;
        let b = px & 0xff;
        (r << self.red_offset) | (g << self.green_offset) | (b << self.blue_offset)
    }
}

impl Display for LinuxFramebuffer {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn push_row(&mut self, row: usize, start_col: usize, pixels: &[u32]) -> Result<(), DisplayError> {
        if row >= self.rows {
            return Ok(());
        }
        let n = pixels.len().min(self.cols.saturating_sub(start_col));
        let mut bytes = Vec::with_capacity(n * 4);
        for &px in &pixels[..n] {
            bytes.extend_from_slice(&self.pack(px).to_ne_bytes());
        }
        let offset = (self.yoffset as u64 + row as u64) * self.line_length as u64
            + (self.xoffset as u64 + start_col as u64) * 4;
        self.file.write_all_at(&bytes, offset)?;
        Ok(())
    }
}

/// Resolve the framebuffer device path: config value, then `$FRAMEBUFFER`,
/// then `/dev/fb0`.
pub fn device_path(configured: Option<&Path>) -> PathBuf {
    if let Some(p) = configured {
        return p.to_path_buf();
    }
    std::env::var_os("FRAMEBUFFER")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/dev/fb0"))
}
