//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s.
//! The map lives in Rust so the wasm facade and native hosts agree on it.
//!
//! - Delete / Backspace removes the selected drawing
//! - Escape cancels the active creation or drag, else deselects
//! - ⌥ + letter picks a drawing tool

use crate::input::InputEvent;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    ToolHorizontalLine,
    ToolRay,
    ToolParallelChannel,

    // ── Edit ──
    Delete,
    Cancel,

    // ── Snapping ──
    ToggleMagnet,
}

/// Resolves key events into shortcut actions.
///
/// Tool bindings use ⌥ (Alt) so plain letters stay free for the host's
/// own symbol search box.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"h"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // Browser/OS shortcuts are never ours.
        if cmd {
            return None;
        }

        if alt && !shift {
            return match key {
                "h" | "H" | "˙" => Some(ShortcutAction::ToolHorizontalLine),
                "t" | "T" | "†" => Some(ShortcutAction::ToolRay),
                "p" | "P" | "π" => Some(ShortcutAction::ToolParallelChannel),
                "m" | "M" | "µ" => Some(ShortcutAction::ToggleMagnet),
                _ => None,
            };
        }

        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Cancel),
            _ => None,
        }
    }

    /// Resolve an `InputEvent::Key`; pointer events never map.
    pub fn resolve_event(event: &InputEvent) -> Option<ShortcutAction> {
        match event {
            InputEvent::Key { key, modifiers } => {
                Self::resolve(key, modifiers.ctrl, modifiers.shift, modifiers.alt, modifiers.meta)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Modifiers;

    #[test]
    fn resolve_tool_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("h", false, false, true, false),
            Some(ShortcutAction::ToolHorizontalLine)
        );
        assert_eq!(
            ShortcutMap::resolve("t", false, false, true, false),
            Some(ShortcutAction::ToolRay)
        );
        assert_eq!(
            ShortcutMap::resolve("p", false, false, true, false),
            Some(ShortcutAction::ToolParallelChannel)
        );
        // macOS reports the composed character for ⌥P.
        assert_eq!(
            ShortcutMap::resolve("π", false, false, true, false),
            Some(ShortcutAction::ToolParallelChannel)
        );
    }

    #[test]
    fn plain_letters_are_unbound() {
        assert_eq!(ShortcutMap::resolve("h", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("t", false, false, false, false), None);
    }

    #[test]
    fn resolve_delete() {
        assert_eq!(
            ShortcutMap::resolve("Delete", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", false, false, false, false),
            Some(ShortcutAction::Delete)
        );
        // ⌘Backspace belongs to the browser.
        assert_eq!(ShortcutMap::resolve("Backspace", false, false, false, true), None);
    }

    #[test]
    fn resolve_escape_and_magnet() {
        assert_eq!(
            ShortcutMap::resolve("Escape", false, false, false, false),
            Some(ShortcutAction::Cancel)
        );
        assert_eq!(
            ShortcutMap::resolve("m", false, false, true, false),
            Some(ShortcutAction::ToggleMagnet)
        );
    }

    #[test]
    fn resolve_from_event() {
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        let event = InputEvent::Key {
            key: "h".into(),
            modifiers: alt,
        };
        assert_eq!(
            ShortcutMap::resolve_event(&event),
            Some(ShortcutAction::ToolHorizontalLine)
        );
        assert_eq!(ShortcutMap::resolve_event(&InputEvent::click(0.0, 0.0)), None);
    }
}
