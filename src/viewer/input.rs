//! Input decoding: raw key bytes to commands.
//!
//! Pure logic, no I/O. A numeric-prefix accumulator collects digits until
//! the next command key consumes them (each command has its own default),
//! and the mark commands hold a one-key prefix state for the mark symbol.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};

use crate::viewer::keymap::{ctrl, Keymap, Op};

const ESC: u8 = 0x1b;

/// Ceiling for the repeat-count accumulator. No command needs more, and the
/// scroll math downstream multiplies counts into `i32` space.
const MAX_COUNT: u32 = 99_999;

/// A decoded command: the operation, the numeric prefix in effect when it
/// was typed (0 = none typed), and the mark symbol for mark operations.
#[derive(Debug)]
pub struct Command {
    pub op: Op,
    pub count: u32,
    pub arg: Option<char>,
}

impl Command {
    /// The repeat count, or `def` when no prefix was typed.
    pub fn count_or(&self, def: u32) -> u32 {
        if self.count > 0 { self.count } else { def }
    }
}

enum Pending {
    None,
    MarkSymbol(Op),
}

pub struct Decoder {
    keymap: Keymap,
    count: u32,
    pending: Pending,
}

impl Decoder {
    pub fn new(keymap: Keymap) -> Self {
        Self {
            keymap,
            count: 0,
            pending: Pending::None,
        }
    }

    /// Feed one input byte; returns a command once one is complete.
    ///
    /// Digits accumulate, Esc cancels the accumulator, unknown keys are
    /// ignored (the pending count survives them).
    pub fn feed(&mut self, key: u8) -> Option<Command> {
        if let Pending::MarkSymbol(op) = self.pending {
            self.pending = Pending::None;
            return Some(Command {
                op,
                count: 0,
                arg: Some(key as char),
            });
        }

        if key.is_ascii_digit() {
            let digit = (key - b'0') as u32;
            self.count = self
                .count
                .saturating_mul(10)
                .saturating_add(digit)
                .min(MAX_COUNT);
            return None;
        }
        if key == ESC {
            self.count = 0;
            return None;
        }

        let op = self.keymap.lookup(key)?;
        match op {
            Op::SetMark | Op::JumpMark | Op::JumpMarkRow => {
                self.pending = Pending::MarkSymbol(op);
                None
            }
            _ => {
                let count = std::mem::take(&mut self.count);
                Some(Command {
                    op,
                    count,
                    arg: None,
                })
            }
        }
    }
}

/// Reduce a crossterm key event to the single input byte the decoder and
/// keymap work in. Arrow and paging keys are synthesized into their
/// classic key equivalents.
pub fn key_event_byte(ev: &KeyEvent) -> Option<u8> {
    if ev.kind == KeyEventKind::Release {
        return None;
    }
    match ev.code {
        KeyCode::Char(c) if ev.modifiers.contains(KeyModifiers::CONTROL) => {
            c.is_ascii().then(|| ctrl(c.to_ascii_lowercase() as u8))
        }
        KeyCode::Char(c) => c.is_ascii().then_some(c as u8),
        KeyCode::Backspace => Some(0x7f),
        KeyCode::Esc => Some(ESC),
        KeyCode::Enter => Some(b'\r'),
        KeyCode::Up => Some(b'k'),
        KeyCode::Down => Some(b'j'),
        KeyCode::Left => Some(b'h'),
        KeyCode::Right => Some(b'l'),
        KeyCode::PageDown => Some(b' '),
        KeyCode::PageUp => Some(ctrl(b'u')),
        _ => None,
    }
}

/// Synthesize wheel motion into scroll key bytes. The pointing device is
/// just another producer of key events; it never touches viewer state.
pub fn mouse_event_byte(ev: &MouseEvent) -> Option<u8> {
    match ev.kind {
        MouseEventKind::ScrollDown => Some(b'j'),
        MouseEventKind::ScrollUp => Some(b'k'),
        MouseEventKind::ScrollLeft => Some(b'h'),
        MouseEventKind::ScrollRight => Some(b'l'),
        _ => None,
    }
}
