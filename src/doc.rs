//! Document rendering collaborator: open a document, report its page count,
//! render one page at a zoom/rotation into a flat pixel buffer.
//!
//! The viewer core only sees the [`Document`] trait. The built-in backend,
//! [`ImageDocument`], treats a raster image file (or a directory of them,
//! one page per file) as a document.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use image::imageops::FilterType;
use log::{debug, info};
use thiserror::Error;

/// One rendered page: row-major `rows x cols` pixels, `0x00RRGGBB`.
pub struct PageImage {
    pub pixels: Vec<u32>,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Error)]
pub enum DocError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("document has no pages")]
    Empty,
    #[error("no such page {page} (document has {count})")]
    PageRange { page: usize, count: usize },
}

/// A paginated document that can render any page on demand.
///
/// `zoom` is in percent/10 (zoom 10 = 100%). `rotate` is in degrees;
/// backends may quantize it.
pub trait Document {
    fn page_count(&self) -> usize;
    fn render(&mut self, page: usize, zoom: u32, rotate: i32) -> Result<PageImage, DocError>;
}

const PAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Raster-image document: a single image file is a one-page document, a
/// directory is one page per image file, in filename order.
pub struct ImageDocument {
    pages: Vec<PathBuf>,
    // Decoded originals, filled lazily. Scaling/rotation happens per render
    // call so only the decode cost is paid once per page.
    cache: HashMap<usize, DynamicImage>,
}

impl ImageDocument {
    pub fn open(path: &Path) -> Result<Self, DocError> {
        let meta = fs::metadata(path).map_err(|source| DocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut pages = if meta.is_dir() {
            let entries = fs::read_dir(path).map_err(|source| DocError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut pages: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| is_page_file(p))
                .collect();
            pages.sort();
            pages
        } else {
            vec![path.to_path_buf()]
        };
        pages.retain(|p| is_page_file(p));
        if pages.is_empty() {
            return Err(DocError::Empty);
        }
        info!("doc: opened {} ({} page(s))", path.display(), pages.len());
        Ok(Self {
            pages,
            cache: HashMap::new(),
        })
    }

    fn original(&mut self, page: usize) -> Result<&DynamicImage, DocError> {
        if !self.cache.contains_key(&page) {
            let path = &self.pages[page - 1];
            debug!("doc: decoding page {page} from {}", path.display());
            let img = image::open(path).map_err(|source| DocError::Decode {
                path: path.clone(),
                source,
            })?;
            self.cache.insert(page, img);
        }
        Ok(&self.cache[&page])
    }
}

fn is_page_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

impl Document for ImageDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render(&mut self, page: usize, zoom: u32, rotate: i32) -> Result<PageImage, DocError> {
        let count = self.pages.len();
        if page < 1 || page > count {
            return Err(DocError::PageRange { page, count });
        }
        let original = self.original(page)?;

        // zoom is percent/10: zoom 10 renders at original size.
        let w = ((original.width() as u64 * zoom as u64) / 10).max(1) as u32;
        let h = ((original.height() as u64 * zoom as u64) / 10).max(1) as u32;
        let scaled = original.resize_exact(w, h, FilterType::Triangle);

        let rotated = match quarter_turns(rotate) {
            1 => scaled.rotate90(),
            2 => scaled.rotate180(),
            3 => scaled.rotate270(),
            _ => scaled,
        };

        let rgba = rotated.to_rgba8();
        let (cols, rows) = (rgba.width() as usize, rgba.height() as usize);
        let pixels = rgba
            .pixels()
            .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
            .collect();
        debug!("doc: rendered page {page} at zoom {zoom} rotate {rotate} -> {rows}x{cols}");
        Ok(PageImage { pixels, rows, cols })
    }
}

/// Quantize a rotation in degrees to the nearest quarter turn (0..=3).
fn quarter_turns(rotate: i32) -> i32 {
    let deg = rotate.rem_euclid(360);
    ((deg + 45) / 90) % 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn quarter_turn_quantization() {
        assert_eq!(quarter_turns(0), 0);
        assert_eq!(quarter_turns(44), 0);
        assert_eq!(quarter_turns(45), 1);
        assert_eq!(quarter_turns(90), 1);
        assert_eq!(quarter_turns(180), 2);
        assert_eq!(quarter_turns(270), 3);
        assert_eq!(quarter_turns(359), 0);
        assert_eq!(quarter_turns(-90), 3);
    }

    fn write_png(path: &Path, w: u32, h: u32, color: [u8; 3]) {
        let img = RgbaImage::from_pixel(w, h, Rgba([color[0], color[1], color[2], 255]));
        img.save(path).unwrap();
    }

    #[test]
    fn single_file_is_one_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        write_png(&path, 4, 3, [255, 0, 0]);
        let doc = ImageDocument::open(&path).unwrap();
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn directory_pages_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("02.png"), 2, 2, [0, 255, 0]);
        write_png(&dir.path().join("01.png"), 2, 2, [255, 0, 0]);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let mut doc = ImageDocument::open(dir.path()).unwrap();
        assert_eq!(doc.page_count(), 2);
        // Page 1 is 01.png (red).
        let img = doc.render(1, 10, 0).unwrap();
        assert_eq!(img.pixels[0], 0x00ff_0000);
    }

    #[test]
    fn empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageDocument::open(dir.path()),
            Err(DocError::Empty)
        ));
    }

    #[test]
    fn render_scales_by_zoom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        write_png(&path, 10, 20, [0, 0, 255]);
        let mut doc = ImageDocument::open(&path).unwrap();
        let img = doc.render(1, 20, 0).unwrap();
        assert_eq!((img.cols, img.rows), (20, 40));
        let img = doc.render(1, 5, 0).unwrap();
        assert_eq!((img.cols, img.rows), (5, 10));
    }

    #[test]
    fn render_rotates_quarter_turns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        write_png(&path, 10, 20, [0, 0, 255]);
        let mut doc = ImageDocument::open(&path).unwrap();
        let img = doc.render(1, 10, 90).unwrap();
        assert_eq!((img.cols, img.rows), (20, 10));
    }

    #[test]
    fn render_out_of_range_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        write_png(&path, 2, 2, [1, 2, 3]);
        let mut doc = ImageDocument::open(&path).unwrap();
        assert!(matches!(
            doc.render(2, 10, 0),
            Err(DocError::PageRange { page: 2, count: 1 })
        ));
    }
}
