use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use fbview::config;
use fbview::doc::ImageDocument;
use fbview::fb::{self, LinuxFramebuffer};
use fbview::viewer;

#[derive(Parser)]
#[command(name = "fbview", about = "Paginated raster document viewer for the Linux framebuffer")]
struct Cli {
    /// Rotation in degrees
    #[arg(short = 'r', long = "rotate")]
    rotate: Option<i32>,

    /// Zoom in percent/10 (15 = 150%)
    #[arg(short = 'z', long = "zoom")]
    zoom: Option<u32>,

    /// Initial page
    #[arg(short = 'p', long = "page", default_value_t = 1)]
    page: usize,

    /// Log output file path (enables logging when specified)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Image file, or directory of image files (one page per file)
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("fbview: cannot open log file {}: {e}", log_path.display());
                return ExitCode::FAILURE;
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }
    // no --log: logger stays uninitialized so nothing scribbles on the
    // terminal the status line lives on

    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("fbview: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    cfg.merge_cli(cli.zoom, cli.rotate);
    let config = cfg.resolve();

    let Some(input) = cli.input else {
        eprintln!("usage: fbview [-r rotation] [-z zoom x10] [-p page] filename");
        return ExitCode::FAILURE;
    };

    let doc = match ImageDocument::open(&input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("fbview: cannot open <{}>: {e}", input.display());
            return ExitCode::FAILURE;
        }
    };

    let device = fb::device_path(config.device.as_deref());
    let mut display = match LinuxFramebuffer::open(&device) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("fbview: {e}");
            return ExitCode::FAILURE;
        }
    };

    use fbview::doc::Document;
    let start_page = cli.page.clamp(1, doc.page_count());
    info!(
        "fbview: {} page {start_page}/{}",
        input.display(),
        doc.page_count()
    );

    let label = input.display().to_string();
    let reopen_path = input.clone();
    let opener = Box::new(move || ImageDocument::open(&reopen_path));

    if let Err(e) = viewer::run(doc, opener, label, &mut display, &config, start_page) {
        eprintln!("fbview: {e:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
