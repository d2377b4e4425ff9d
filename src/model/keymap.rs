//! Keyboard sections and the action flags they drive.
//!
//! The keyboard is carved into six sections:
//!
//! ```text
//!         1                   2
//!  +----------------+  +-------------+
//!  | F1 ... F5      |  | F6 ... F12  |
//!  +----------------+  +-------------+
//!
//!         3                         4
//!  +----------------+  +-------------------------+
//!  | ` 1 2 3 4 5 6  |  | 7 8 9 0 BACKSPACE       |
//!  | Q W E R T Y    |  |   Y U I O P [ ] \       |
//!  | A S D F G      |  | H J K L ; ' ENTER       |
//!  | Z X C V B      |  | N M , . /               |
//!  | LSHIFT         |  |                  RSHIFT |
//!  +----------------+  +-------------------------+
//!
//!            5                          6
//!  +----------------------+  +----------------------+
//!  | PRT SCR PAUSE        |  | UP LEFT DOWN RIGHT   |
//!  | INSERT HOME PAGEUP   |  +----------------------+
//!  | DELETE END PAGEDOWN  |
//!  +----------------------+
//! ```
//!
//! Sections 1-5 each drive a single action. Section 6 binds every arrow key
//! to its own action. Bindings are applied in section order and a later
//! binding replaces an earlier one, so `y` (listed in both 3 and 4) ends up
//! running backward.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic action a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "cam-left")]
    CamLeft,
    #[serde(rename = "cam-right")]
    CamRight,
    #[serde(rename = "arrow_up")]
    Forward,
    #[serde(rename = "arrow_down")]
    Backward,
    #[serde(rename = "arrow_left")]
    TurnLeft,
    #[serde(rename = "arrow_right")]
    TurnRight,
    #[serde(rename = "make-bunny")]
    MakeBunny,
    #[serde(rename = "do-something")]
    DoSomething,
    #[serde(rename = "ignore")]
    Ignore,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::CamLeft,
        Action::CamRight,
        Action::Forward,
        Action::Backward,
        Action::TurnLeft,
        Action::TurnRight,
        Action::MakeBunny,
        Action::DoSomething,
        Action::Ignore,
    ];

    /// Name used in key-map dumps and config files.
    pub fn name(self) -> &'static str {
        match self {
            Action::CamLeft => "cam-left",
            Action::CamRight => "cam-right",
            Action::Forward => "arrow_up",
            Action::Backward => "arrow_down",
            Action::TurnLeft => "arrow_left",
            Action::TurnRight => "arrow_right",
            Action::MakeBunny => "make-bunny",
            Action::DoSomething => "do-something",
            Action::Ignore => "ignore",
        }
    }

    pub fn is_locomotion(self) -> bool {
        matches!(
            self,
            Action::Forward | Action::Backward | Action::TurnLeft | Action::TurnRight
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the six keyboard tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    FunctionLeft,
    FunctionRight,
    MainLeft,
    MainRight,
    Navigation,
    Arrows,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::FunctionLeft,
        Section::FunctionRight,
        Section::MainLeft,
        Section::MainRight,
        Section::Navigation,
        Section::Arrows,
    ];

    pub fn keys(self) -> &'static [&'static str] {
        match self {
            Section::FunctionLeft => &["f1", "f2", "f3", "f4", "f5"],
            Section::FunctionRight => &["f6", "f7", "f8", "f9", "f10", "f11", "f12"],
            Section::MainLeft => &[
                "`", "1", "2", "3", "4", "5", "6", //
                "q", "w", "e", "r", "t", "y", //
                "a", "s", "d", "f", "g", //
                "lshift", "z", "x", "c", "v", "b",
            ],
            Section::MainRight => &[
                "7", "8", "9", "0", "backspace", //
                "y", "u", "i", "o", "p", "[", "]", "\\", //
                "h", "j", "k", "l", ";", "'", "enter", //
                "n", "m", ",", ".", "/", "rshift",
            ],
            Section::Navigation => &[
                "print_screen", "scroll_lock", "pause", //
                "insert", "home", "page_up", //
                "delete", "end", "page_down",
            ],
            Section::Arrows => &["arrow_left", "arrow_right", "arrow_up", "arrow_down"],
        }
    }

    /// Action bound to `key` when it is pressed inside this section.
    pub fn action_for(self, key: &str) -> Option<Action> {
        match self {
            Section::FunctionLeft => Some(Action::CamLeft),
            Section::FunctionRight => Some(Action::CamRight),
            Section::MainLeft => Some(Action::Forward),
            Section::MainRight => Some(Action::Backward),
            Section::Navigation => Some(Action::MakeBunny),
            Section::Arrows => match key {
                "arrow_left" => Some(Action::TurnLeft),
                "arrow_right" => Some(Action::TurnRight),
                "arrow_up" => Some(Action::Forward),
                "arrow_down" => Some(Action::Backward),
                _ => None,
            },
        }
    }
}

/// Lookup from key name to bound action.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<String, Action>,
}

impl KeyMap {
    pub fn from_sections() -> Self {
        let mut bindings = HashMap::new();
        for section in Section::ALL {
            for key in section.keys() {
                if let Some(action) = section.action_for(key) {
                    bindings.insert((*key).to_string(), action);
                }
            }
        }
        Self { bindings }
    }

    /// Overlay extra bindings on top of the current ones.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Action>) -> Self {
        for (key, action) in overrides {
            let key = key.to_ascii_lowercase();
            if let Some(previous) = self.bindings.insert(key.clone(), *action) {
                tracing::debug!(%key, from = %previous, to = %action, "rebinding key");
            }
        }
        self
    }

    pub fn action_for(&self, key: &str) -> Option<Action> {
        self.bindings.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Keys bound to `action`, sorted.
    pub fn keys_for(&self, action: Action) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::from_sections()
    }
}

/// Pressed flag per action.
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    pressed: [bool; Action::ALL.len()],
}

impl ActionState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(action: Action) -> usize {
        action as usize
    }

    pub fn set(&mut self, action: Action, pressed: bool) {
        self.pressed[Self::slot(action)] = pressed;
    }

    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed[Self::slot(action)]
    }

    /// Read and clear a flag. Used for actions that fire once per press.
    pub fn take(&mut self, action: Action) -> bool {
        std::mem::take(&mut self.pressed[Self::slot(action)])
    }

    pub fn any_locomotion(&self) -> bool {
        Action::ALL
            .iter()
            .any(|a| a.is_locomotion() && self.is_pressed(*a))
    }

    pub fn release_all(&mut self) {
        self.pressed = [false; Action::ALL.len()];
    }

    pub fn pressed(&self) -> impl Iterator<Item = Action> + '_ {
        Action::ALL.into_iter().filter(|a| self.is_pressed(*a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_drive_camera() {
        let map = KeyMap::from_sections();
        for key in ["f1", "f3", "f5"] {
            assert_eq!(map.action_for(key), Some(Action::CamLeft), "{key}");
        }
        for key in ["f6", "f9", "f12"] {
            assert_eq!(map.action_for(key), Some(Action::CamRight), "{key}");
        }
    }

    #[test]
    fn main_block_splits_forward_and_backward() {
        let map = KeyMap::from_sections();
        assert_eq!(map.action_for("q"), Some(Action::Forward));
        assert_eq!(map.action_for("lshift"), Some(Action::Forward));
        assert_eq!(map.action_for("`"), Some(Action::Forward));
        assert_eq!(map.action_for("enter"), Some(Action::Backward));
        assert_eq!(map.action_for("\\"), Some(Action::Backward));
        assert_eq!(map.action_for("rshift"), Some(Action::Backward));
    }

    #[test]
    fn y_is_claimed_by_the_later_section() {
        let map = KeyMap::from_sections();
        assert_eq!(map.action_for("y"), Some(Action::Backward));
    }

    #[test]
    fn arrows_bind_to_their_own_actions() {
        let map = KeyMap::from_sections();
        assert_eq!(map.action_for("arrow_left"), Some(Action::TurnLeft));
        assert_eq!(map.action_for("arrow_right"), Some(Action::TurnRight));
        assert_eq!(map.action_for("arrow_up"), Some(Action::Forward));
        assert_eq!(map.action_for("arrow_down"), Some(Action::Backward));
    }

    #[test]
    fn navigation_block_spawns() {
        let map = KeyMap::from_sections();
        assert_eq!(map.keys_for(Action::MakeBunny).len(), 9);
        assert_eq!(map.action_for("page_down"), Some(Action::MakeBunny));
    }

    #[test]
    fn every_listed_key_is_bound_once() {
        let map = KeyMap::from_sections();
        let listed: usize = Section::ALL.iter().map(|s| s.keys().len()).sum();
        // `y` appears twice
        assert_eq!(map.len(), listed - 1);
        assert_eq!(map.action_for("escape"), None);
        assert_eq!(map.action_for("-"), None);
    }

    #[test]
    fn overrides_replace_and_extend() {
        let mut extra = BTreeMap::new();
        extra.insert("Space".to_string(), Action::DoSomething);
        extra.insert("q".to_string(), Action::Ignore);
        let map = KeyMap::from_sections().with_overrides(&extra);
        assert_eq!(map.action_for("space"), Some(Action::DoSomething));
        assert_eq!(map.action_for("q"), Some(Action::Ignore));
    }

    #[test]
    fn take_clears_one_shot_flags() {
        let mut state = ActionState::new();
        state.set(Action::MakeBunny, true);
        assert!(state.take(Action::MakeBunny));
        assert!(!state.take(Action::MakeBunny));
    }

    #[test]
    fn locomotion_ignores_camera_and_spawn() {
        let mut state = ActionState::new();
        state.set(Action::CamLeft, true);
        state.set(Action::MakeBunny, true);
        assert!(!state.any_locomotion());
        state.set(Action::TurnRight, true);
        assert!(state.any_locomotion());
        state.release_all();
        assert_eq!(state.pressed().count(), 0);
    }

    #[test]
    fn actions_round_trip_through_config_names() {
        let parsed: Action = serde_json::from_str("\"make-bunny\"").unwrap();
        assert_eq!(parsed, Action::MakeBunny);
        assert_eq!(serde_json::to_string(&Action::Forward).unwrap(), "\"arrow_up\"");
    }
}
