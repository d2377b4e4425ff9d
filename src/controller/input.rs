/// Platform-agnostic input handling system
use crate::model::{Action, ActionState, KeyMap};

/// Platform-independent input events. Key names follow the keymap's naming
/// (`f1`, `arrow_left`, `lshift`, `[`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),
    FocusLost,
    VisibilityChanged { visible: bool },
}

/// A key transition with the shift state it happened under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonEvent {
    pub key: String,
    pub shift: bool,
    pub pressed: bool,
}

impl ButtonEvent {
    /// `a`, `shift-a`, `a-up` or `shift-a-up`.
    pub fn event_name(&self) -> String {
        let prefix = if self.shift { "shift-" } else { "" };
        let suffix = if self.pressed { "" } else { "-up" };
        format!("{prefix}{}{suffix}", self.key)
    }
}

/// Turns raw key events into action flags.
pub struct InputProcessor {
    keymap: KeyMap,
    lshift: bool,
    rshift: bool,
    quit_requested: bool,
}

impl InputProcessor {
    pub fn new(keymap: KeyMap) -> Self {
        Self {
            keymap,
            lshift: false,
            rshift: false,
            quit_requested: false,
        }
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn shift_held(&self) -> bool {
        self.lshift || self.rshift
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Apply one event to `actions`. Returns the button event it produced,
    /// if any.
    pub fn process_event(&mut self, event: &InputEvent, actions: &mut ActionState) -> Option<ButtonEvent> {
        match event {
            InputEvent::KeyDown(key) => {
                let button = ButtonEvent {
                    key: key.clone(),
                    shift: self.shift_held(),
                    pressed: true,
                };
                self.track_shift(key, true);
                if button.shift && key == "escape" {
                    tracing::info!("shift-escape pressed, quitting");
                    self.quit_requested = true;
                }
                self.apply(&button, actions);
                Some(button)
            }
            InputEvent::KeyUp(key) => {
                let button = ButtonEvent {
                    key: key.clone(),
                    shift: self.shift_held(),
                    pressed: false,
                };
                self.track_shift(key, false);
                self.apply(&button, actions);
                Some(button)
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {
                self.lshift = false;
                self.rshift = false;
                actions.release_all();
                None
            }
        }
    }

    fn track_shift(&mut self, key: &str, down: bool) {
        match key {
            "lshift" => self.lshift = down,
            "rshift" => self.rshift = down,
            _ => {}
        }
    }

    /// Shifted and plain events drive the same action.
    fn apply(&self, button: &ButtonEvent, actions: &mut ActionState) {
        let Some(action) = self.keymap.action_for(&button.key) else {
            return;
        };
        tracing::trace!(event = %button.event_name(), %action, "key");
        match (action, button.pressed) {
            // one-shots are consumed by the frame loop, releasing early must not eat them
            (Action::MakeBunny | Action::DoSomething | Action::Ignore, false) => {}
            (action, pressed) => actions.set(action, pressed),
        }
    }
}

/// Key name for a W3C `KeyboardEvent.code` value.
pub fn key_name_from_code(code: &str) -> Option<&'static str> {
    let name = match code {
        "F1" => "f1",
        "F2" => "f2",
        "F3" => "f3",
        "F4" => "f4",
        "F5" => "f5",
        "F6" => "f6",
        "F7" => "f7",
        "F8" => "f8",
        "F9" => "f9",
        "F10" => "f10",
        "F11" => "f11",
        "F12" => "f12",
        "Backquote" => "`",
        "Digit0" => "0",
        "Digit1" => "1",
        "Digit2" => "2",
        "Digit3" => "3",
        "Digit4" => "4",
        "Digit5" => "5",
        "Digit6" => "6",
        "Digit7" => "7",
        "Digit8" => "8",
        "Digit9" => "9",
        "Minus" => "-",
        "Equal" => "=",
        "Backspace" => "backspace",
        "Tab" => "tab",
        "KeyA" => "a",
        "KeyB" => "b",
        "KeyC" => "c",
        "KeyD" => "d",
        "KeyE" => "e",
        "KeyF" => "f",
        "KeyG" => "g",
        "KeyH" => "h",
        "KeyI" => "i",
        "KeyJ" => "j",
        "KeyK" => "k",
        "KeyL" => "l",
        "KeyM" => "m",
        "KeyN" => "n",
        "KeyO" => "o",
        "KeyP" => "p",
        "KeyQ" => "q",
        "KeyR" => "r",
        "KeyS" => "s",
        "KeyT" => "t",
        "KeyU" => "u",
        "KeyV" => "v",
        "KeyW" => "w",
        "KeyX" => "x",
        "KeyY" => "y",
        "KeyZ" => "z",
        "BracketLeft" => "[",
        "BracketRight" => "]",
        "Backslash" => "\\",
        "Semicolon" => ";",
        "Quote" => "'",
        "Enter" => "enter",
        "Comma" => ",",
        "Period" => ".",
        "Slash" => "/",
        "ShiftLeft" => "lshift",
        "ShiftRight" => "rshift",
        "Space" => "space",
        "Escape" => "escape",
        "PrintScreen" => "print_screen",
        "ScrollLock" => "scroll_lock",
        "Pause" => "pause",
        "Insert" => "insert",
        "Home" => "home",
        "PageUp" => "page_up",
        "Delete" => "delete",
        "End" => "end",
        "PageDown" => "page_down",
        "ArrowLeft" => "arrow_left",
        "ArrowRight" => "arrow_right",
        "ArrowUp" => "arrow_up",
        "ArrowDown" => "arrow_down",
        _ => return None,
    };
    Some(name)
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use winit::event::{ElementState, KeyEvent};
    use winit::keyboard::{KeyCode, PhysicalKey};

    pub fn key_name(code: KeyCode) -> Option<&'static str> {
        let name = match code {
            KeyCode::F1 => "F1",
            KeyCode::F2 => "F2",
            KeyCode::F3 => "F3",
            KeyCode::F4 => "F4",
            KeyCode::F5 => "F5",
            KeyCode::F6 => "F6",
            KeyCode::F7 => "F7",
            KeyCode::F8 => "F8",
            KeyCode::F9 => "F9",
            KeyCode::F10 => "F10",
            KeyCode::F11 => "F11",
            KeyCode::F12 => "F12",
            KeyCode::Backquote => "Backquote",
            KeyCode::Digit0 => "Digit0",
            KeyCode::Digit1 => "Digit1",
            KeyCode::Digit2 => "Digit2",
            KeyCode::Digit3 => "Digit3",
            KeyCode::Digit4 => "Digit4",
            KeyCode::Digit5 => "Digit5",
            KeyCode::Digit6 => "Digit6",
            KeyCode::Digit7 => "Digit7",
            KeyCode::Digit8 => "Digit8",
            KeyCode::Digit9 => "Digit9",
            KeyCode::Minus => "Minus",
            KeyCode::Equal => "Equal",
            KeyCode::Backspace => "Backspace",
            KeyCode::Tab => "Tab",
            KeyCode::KeyA => "KeyA",
            KeyCode::KeyB => "KeyB",
            KeyCode::KeyC => "KeyC",
            KeyCode::KeyD => "KeyD",
            KeyCode::KeyE => "KeyE",
            KeyCode::KeyF => "KeyF",
            KeyCode::KeyG => "KeyG",
            KeyCode::KeyH => "KeyH",
            KeyCode::KeyI => "KeyI",
            KeyCode::KeyJ => "KeyJ",
            KeyCode::KeyK => "KeyK",
            KeyCode::KeyL => "KeyL",
            KeyCode::KeyM => "KeyM",
            KeyCode::KeyN => "KeyN",
            KeyCode::KeyO => "KeyO",
            KeyCode::KeyP => "KeyP",
            KeyCode::KeyQ => "KeyQ",
            KeyCode::KeyR => "KeyR",
            KeyCode::KeyS => "KeyS",
            KeyCode::KeyT => "KeyT",
            KeyCode::KeyU => "KeyU",
            KeyCode::KeyV => "KeyV",
            KeyCode::KeyW => "KeyW",
            KeyCode::KeyX => "KeyX",
            KeyCode::KeyY => "KeyY",
            KeyCode::KeyZ => "KeyZ",
            KeyCode::BracketLeft => "BracketLeft",
            KeyCode::BracketRight => "BracketRight",
            KeyCode::Backslash => "Backslash",
            KeyCode::Semicolon => "Semicolon",
            KeyCode::Quote => "Quote",
            KeyCode::Enter => "Enter",
            KeyCode::Comma => "Comma",
            KeyCode::Period => "Period",
            KeyCode::Slash => "Slash",
            KeyCode::ShiftLeft => "ShiftLeft",
            KeyCode::ShiftRight => "ShiftRight",
            KeyCode::Space => "Space",
            KeyCode::Escape => "Escape",
            KeyCode::PrintScreen => "PrintScreen",
            KeyCode::ScrollLock => "ScrollLock",
            KeyCode::Pause => "Pause",
            KeyCode::Insert => "Insert",
            KeyCode::Home => "Home",
            KeyCode::PageUp => "PageUp",
            KeyCode::Delete => "Delete",
            KeyCode::End => "End",
            KeyCode::PageDown => "PageDown",
            KeyCode::ArrowLeft => "ArrowLeft",
            KeyCode::ArrowRight => "ArrowRight",
            KeyCode::ArrowUp => "ArrowUp",
            KeyCode::ArrowDown => "ArrowDown",
            _ => return None,
        };
        key_name_from_code(name)
    }

    /// Auto-repeats are dropped, as are keys with no name.
    pub fn key_event_to_input(event: &KeyEvent) -> Option<InputEvent> {
        if event.repeat {
            return None;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return None;
        };
        let name = key_name(code)?.to_string();
        Some(match event.state {
            ElementState::Pressed => InputEvent::KeyDown(name),
            ElementState::Released => InputEvent::KeyUp(name),
        })
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::KeyboardEvent;

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> Option<InputEvent> {
        if e.repeat() {
            return None;
        }
        let name = key_name_from_code(&e.code())?.to_string();
        Some(if is_down { InputEvent::KeyDown(name) } else { InputEvent::KeyUp(name) })
    }
}
