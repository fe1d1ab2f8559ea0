//! The viewer: a single navigation loop over a multi-producer event queue.
//!
//! Producers only synthesize events; every piece of window and viewport
//! state has exactly one writer, the loop below.
//!
//!   keyboard/mouse thread -> Event::Key(byte) ->
//!   SIGCONT watcher       -> Event::Resumed   -> mpsc -> navigation loop
//!
//! Each event is processed to completion (the renderer may block) before
//! the next is read; `recv` is the loop's only suspension point.

pub mod input;
pub mod keymap;
pub mod nav;
pub mod pagestore;
pub mod terminal;
pub mod viewport;

use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use crossterm::event::{self, Event as TermEvent};
use log::{debug, info, warn};
use nix::sys::signal::{SigSet, Signal};

use crate::config::Config;
use crate::doc::{DocError, Document};
use crate::fb::Display;

use input::{key_event_byte, mouse_event_byte, Decoder};
use keymap::Keymap;
use nav::{NavOptions, Navigator};

/// Everything the navigation loop reacts to.
enum Event {
    Key(u8),
    /// Process continued after a stop; the terminal needs re-setup.
    Resumed,
}

/// Run the viewer until quit.
pub fn run<D: Document>(
    doc: D,
    opener: Box<dyn Fn() -> Result<D, DocError>>,
    label: String,
    display: &mut dyn Display,
    config: &Config,
    start_page: usize,
) -> Result<()> {
    let mut keymap = Keymap::default_bindings();
    keymap
        .apply_overrides(&config.keys)
        .context("invalid [keys] section in config")?;
    let mut decoder = Decoder::new(keymap);

    // Block SIGCONT before any thread exists so the watcher thread's
    // SigSet::wait is the only delivery path.
    let mut sigs = SigSet::empty();
    sigs.add(Signal::SIGCONT);
    sigs.thread_block().context("cannot block SIGCONT")?;

    let mut guard = terminal::RawGuard::enter().context("cannot set up terminal")?;

    let (tx, rx) = mpsc::channel::<Event>();

    // Keyboard + mouse producer. Ends once the consumer hangs up.
    let key_tx = tx.clone();
    thread::spawn(move || {
        loop {
            let ev = match event::read() {
                Ok(ev) => ev,
                Err(e) => {
                    warn!("input: read failed: {e}");
                    break;
                }
            };
            let byte = match ev {
                TermEvent::Key(k) => key_event_byte(&k),
                TermEvent::Mouse(m) => mouse_event_byte(&m),
                _ => None,
            };
            if let Some(b) = byte {
                if key_tx.send(Event::Key(b)).is_err() {
                    break;
                }
            }
        }
        debug!("input: producer exiting");
    });

    // Resume watcher: turns SIGCONT into an ordinary queue event.
    thread::spawn(move || {
        while sigs.wait().is_ok() {
            debug!("signal: SIGCONT");
            if tx.send(Event::Resumed).is_err() {
                break;
            }
        }
    });

    let opts = NavOptions::from(config);
    let mut navigator = Navigator::new(
        doc,
        opener,
        label,
        display.rows(),
        display.cols(),
        opts,
    );
    navigator
        .start(start_page)
        .context("cannot render the first page")?;
    navigator.compose(display).context("cannot draw")?;
    info!("viewer: started at page {}", navigator.current_page());

    while let Ok(ev) = rx.recv() {
        match ev {
            Event::Resumed => {
                guard.setup().context("cannot restore terminal")?;
                navigator.compose(display).context("cannot draw")?;
            }
            Event::Key(byte) => {
                let Some(cmd) = decoder.feed(byte) else {
                    continue;
                };
                debug!("viewer: {:?}", cmd);
                let outcome = navigator
                    .dispatch(&cmd)
                    .context("document rendering failed")?;
                if outcome.quit {
                    break;
                }
                if let Some(msg) = &outcome.status {
                    terminal::draw_status(msg)?;
                }
                if outcome.redraw {
                    navigator.compose(display).context("cannot draw")?;
                }
            }
        }
    }

    guard.cleanup();
    Ok(())
}
