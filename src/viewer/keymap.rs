//! Command table: named operations, default key bindings, TOML overrides.
//!
//! Keys are single input bytes (control keys fold to `byte & 0x1f`, the
//! classic terminal encoding). Historic viewers disagree on bindings, so
//! the table is data: a `[keys]` section in the config file rebinds any
//! key to any named command.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    NextPage,
    PrevPage,
    Goto,
    SetAnchor,
    GotoAnchor,
    ZoomSet,
    ZoomWidth,
    ZoomMargins,
    ZoomHeight,
    ZoomDefault,
    Rotate,
    Invert,
    ScrollDown,
    ScrollUp,
    ScrollLeft,
    ScrollRight,
    ScreenDown,
    ScreenUp,
    Top,
    Bottom,
    Middle,
    CenterCols,
    LeftEdge,
    RightEdge,
    LeftMargin,
    RightMargin,
    SetMark,
    JumpMark,
    JumpMarkRow,
    Info,
    Reload,
    Sleep,
    Redraw,
    Quit,
}

impl Op {
    pub fn from_name(name: &str) -> Option<Op> {
        use Op::*;
        Some(match name {
            "next-page" => NextPage,
            "prev-page" => PrevPage,
            "goto-page" => Goto,
            "set-anchor" => SetAnchor,
            "goto-anchor" => GotoAnchor,
            "zoom" => ZoomSet,
            "zoom-width" => ZoomWidth,
            "zoom-margins" => ZoomMargins,
            "zoom-height" => ZoomHeight,
            "zoom-default" => ZoomDefault,
            "rotate" => Rotate,
            "invert" => Invert,
            "scroll-down" => ScrollDown,
            "scroll-up" => ScrollUp,
            "scroll-left" => ScrollLeft,
            "scroll-right" => ScrollRight,
            "screen-down" => ScreenDown,
            "screen-up" => ScreenUp,
            "top" => Top,
            "bottom" => Bottom,
            "middle" => Middle,
            "center-cols" => CenterCols,
            "left-edge" => LeftEdge,
            "right-edge" => RightEdge,
            "left-margin" => LeftMargin,
            "right-margin" => RightMargin,
            "set-mark" => SetMark,
            "jump-mark" => JumpMark,
            "jump-mark-row" => JumpMarkRow,
            "info" => Info,
            "reload" => Reload,
            "sleep" => Sleep,
            "redraw" => Redraw,
            "quit" => Quit,
            _ => return None,
        })
    }
}

pub const fn ctrl(c: u8) -> u8 {
    c & 0x1f
}

pub struct Keymap {
    map: HashMap<u8, Op>,
}

impl Keymap {
    /// The classic binding set.
    pub fn default_bindings() -> Self {
        use Op::*;
        let mut map = HashMap::new();
        for (key, op) in [
            (ctrl(b'f'), NextPage),
            (b'J', NextPage),
            (ctrl(b'b'), PrevPage),
            (b'K', PrevPage),
            (b'G', Goto),
            (b'o', SetAnchor),
            (b'O', GotoAnchor),
            (b'z', ZoomSet),
            (b'w', ZoomWidth),
            (b'W', ZoomMargins),
            (b'f', ZoomHeight),
            (b'Z', ZoomDefault),
            (b'r', Rotate),
            (b'I', Invert),
            (b'j', ScrollDown),
            (b'k', ScrollUp),
            (b'h', ScrollLeft),
            (b'l', ScrollRight),
            (b' ', ScreenDown),
            (ctrl(b'd'), ScreenDown),
            (0x7f, ScreenUp),
            (ctrl(b'u'), ScreenUp),
            (b'H', Top),
            (b'L', Bottom),
            (b'M', Middle),
            (b'C', CenterCols),
            (b'[', LeftEdge),
            (b']', RightEdge),
            (b'{', LeftMargin),
            (b'}', RightMargin),
            (b'm', SetMark),
            (b'\'', JumpMark),
            (b'`', JumpMarkRow),
            (b'i', Info),
            (b'e', Reload),
            (b'd', Sleep),
            (ctrl(b'l'), Redraw),
            (b'q', Quit),
        ] {
            map.insert(key, op);
        }
        Self { map }
    }

    /// Apply `[keys]` overrides from the config file on top of the defaults.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Result<()> {
        for (spec, name) in overrides {
            let key = parse_key_spec(spec)
                .ok_or_else(|| anyhow!("invalid key spec '{spec}' in [keys]"))?;
            let op = Op::from_name(name)
                .ok_or_else(|| anyhow!("unknown command '{name}' for key '{spec}'"))?;
            debug!("keymap: {spec} -> {name}");
            self.map.insert(key, op);
        }
        Ok(())
    }

    pub fn lookup(&self, key: u8) -> Option<Op> {
        self.map.get(&key).copied()
    }
}

/// Parse a key spec: a single character, `C-x` / `ctrl-x`, or one of the
/// named keys `space`, `backspace`, `tab`, `enter`, `esc`.
pub fn parse_key_spec(spec: &str) -> Option<u8> {
    match spec {
        "space" => return Some(b' '),
        "backspace" | "del" => return Some(0x7f),
        "tab" => return Some(b'\t'),
        "enter" => return Some(b'\r'),
        "esc" => return Some(0x1b),
        _ => {}
    }
    if let Some(rest) = spec.strip_prefix("C-").or_else(|| spec.strip_prefix("ctrl-")) {
        let mut chars = rest.chars();
        let c = chars.next()?;
        if chars.next().is_some() || !c.is_ascii() {
            return None;
        }
        return Some(ctrl(c.to_ascii_lowercase() as u8));
    }
    let mut chars = spec.chars();
    let c = chars.next()?;
    if chars.next().is_some() || !c.is_ascii() {
        return None;
    }
    Some(c as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_cover_classics() {
        let km = Keymap::default_bindings();
        assert_eq!(km.lookup(b'q'), Some(Op::Quit));
        assert_eq!(km.lookup(b'J'), Some(Op::NextPage));
        assert_eq!(km.lookup(ctrl(b'f')), Some(Op::NextPage));
        assert_eq!(km.lookup(b'I'), Some(Op::Invert));
        assert_eq!(km.lookup(b'`'), Some(Op::JumpMarkRow));
        assert_eq!(km.lookup(b'x'), None);
    }

    #[test]
    fn key_spec_parsing() {
        assert_eq!(parse_key_spec("J"), Some(b'J'));
        assert_eq!(parse_key_spec("C-f"), Some(6));
        assert_eq!(parse_key_spec("ctrl-F"), Some(6));
        assert_eq!(parse_key_spec("space"), Some(b' '));
        assert_eq!(parse_key_spec("backspace"), Some(0x7f));
        assert_eq!(parse_key_spec(""), None);
        assert_eq!(parse_key_spec("abc"), None);
    }

    #[test]
    fn overrides_rebind() {
        let mut km = Keymap::default_bindings();
        let mut overrides = HashMap::new();
        overrides.insert("+".to_string(), "zoom".to_string());
        overrides.insert("C-n".to_string(), "next-page".to_string());
        km.apply_overrides(&overrides).unwrap();
        assert_eq!(km.lookup(b'+'), Some(Op::ZoomSet));
        assert_eq!(km.lookup(ctrl(b'n')), Some(Op::NextPage));
        // Defaults survive alongside
        assert_eq!(km.lookup(b'q'), Some(Op::Quit));
    }

    #[test]
    fn overrides_reject_unknown_command() {
        let mut km = Keymap::default_bindings();
        let mut overrides = HashMap::new();
        overrides.insert("x".to_string(), "frobnicate".to_string());
        assert!(km.apply_overrides(&overrides).is_err());
    }
}
