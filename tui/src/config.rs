use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Key strings such as `"q"`, `"enter"`, `"alt-up"` or `"shift-left"`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Keymap {
    pub quit: String,
    pub cursor_up: String,
    pub cursor_down: String,
    pub toggle_complete: String,
    pub edit: String,
    pub add: String,
    pub delete: String,
    pub move_up: String,
    pub move_down: String,
    pub toggle_notes: String,
    pub search: String,
    pub toggle_grouping: String,
    pub prev_month: String,
    pub next_month: String,
    pub calendar_left: String,
    pub calendar_right: String,
    pub calendar_up: String,
    pub calendar_down: String,
    pub select_day: String,
    pub help: String,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            quit: "q".to_string(),
            cursor_up: "up".to_string(),
            cursor_down: "down".to_string(),
            toggle_complete: "x".to_string(),
            edit: "enter".to_string(),
            add: "a".to_string(),
            delete: "d".to_string(),
            move_up: "alt-up".to_string(),
            move_down: "alt-down".to_string(),
            toggle_notes: "o".to_string(),
            search: "/".to_string(),
            toggle_grouping: "g".to_string(),
            prev_month: "[".to_string(),
            next_month: "]".to_string(),
            calendar_left: "shift-left".to_string(),
            calendar_right: "shift-right".to_string(),
            calendar_up: "shift-up".to_string(),
            calendar_down: "shift-down".to_string(),
            select_day: "c".to_string(),
            help: "?".to_string(),
        }
    }
}

/// Everything a key can trigger from the task list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    CursorUp,
    CursorDown,
    ToggleComplete,
    Edit,
    Add,
    Delete,
    MoveUp,
    MoveDown,
    ToggleNotes,
    Search,
    ToggleGrouping,
    PrevMonth,
    NextMonth,
    CalendarLeft,
    CalendarRight,
    CalendarUp,
    CalendarDown,
    SelectDay,
    Help,
}

impl Keymap {
    fn bindings(&self) -> [(&str, Action); 20] {
        [
            (self.quit.as_str(), Action::Quit),
            (self.cursor_up.as_str(), Action::CursorUp),
            (self.cursor_down.as_str(), Action::CursorDown),
            (self.toggle_complete.as_str(), Action::ToggleComplete),
            (self.edit.as_str(), Action::Edit),
            (self.add.as_str(), Action::Add),
            (self.delete.as_str(), Action::Delete),
            (self.move_up.as_str(), Action::MoveUp),
            (self.move_down.as_str(), Action::MoveDown),
            (self.toggle_notes.as_str(), Action::ToggleNotes),
            (self.search.as_str(), Action::Search),
            (self.toggle_grouping.as_str(), Action::ToggleGrouping),
            (self.prev_month.as_str(), Action::PrevMonth),
            (self.next_month.as_str(), Action::NextMonth),
            (self.calendar_left.as_str(), Action::CalendarLeft),
            (self.calendar_right.as_str(), Action::CalendarRight),
            (self.calendar_up.as_str(), Action::CalendarUp),
            (self.calendar_down.as_str(), Action::CalendarDown),
            (self.select_day.as_str(), Action::SelectDay),
            (self.help.as_str(), Action::Help),
        ]
    }

    /// The action bound to a key press, if any
    pub fn action_for(&self, key: &KeyEvent) -> Option<Action> {
        self.bindings()
            .into_iter()
            .find(|(binding, _)| KeyBinding::parse(binding).map(|b| b.matches(key)).unwrap_or(false))
            .map(|(_, action)| action)
    }

    /// Bindings that don't parse
    pub fn invalid_bindings(&self) -> Vec<String> {
        self.bindings()
            .into_iter()
            .filter(|(binding, _)| KeyBinding::parse(binding).is_none())
            .map(|(binding, _)| binding.to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let (mods, key) = match s.rfind('-') {
            // A trailing "-" is the minus key itself
            Some(i) if i + 1 < s.len() => (&s[..i], &s[i + 1..]),
            _ => ("", s),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in mods.split('-').filter(|p| !p.is_empty()) {
            modifiers |= match part.to_lowercase().as_str() {
                "ctrl" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return None,
            };
        }

        let code = match key.to_lowercase().as_str() {
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "enter" => KeyCode::Enter,
            "esc" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "delete" => KeyCode::Delete,
            "insert" => KeyCode::Insert,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            "space" => KeyCode::Char(' '),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return None,
                }
            }
        };
        Some(Self { code, modifiers })
    }

    /// Shift is ignored for printable characters since the terminal
    /// already folds it into the character.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let relevant = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT;
        match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => {
                let mask = KeyModifiers::CONTROL | KeyModifiers::ALT;
                a.eq_ignore_ascii_case(&b)
                    && (a == b || self.modifiers.contains(KeyModifiers::CONTROL))
                    && (key.modifiers & mask) == (self.modifiers & mask)
            }
            (a, b) => a == b && (key.modifiers & relevant) == (self.modifiers & relevant),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ViewConfig {
    /// Start with the list split into priority groups
    pub group_by_priority: bool,
    /// How often pending sync snapshots are drained
    pub tick_rate_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self { group_by_priority: true, tick_rate_ms: 250 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub keymap: Keymap,
    pub view: ViewConfig,
}

/// Read the config file, writing one with defaults if it does not exist
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        let toml = toml::to_string(&config)?;
        fs::write(path, toml).with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote default config");
        return Ok(config);
    }

    let content = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config = toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    for binding in config.keymap.invalid_bindings() {
        tracing::warn!(binding = %binding, "ignoring unrecognised key binding");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_parse_bindings() {
        assert_eq!(
            KeyBinding::parse("alt-up"),
            Some(KeyBinding { code: KeyCode::Up, modifiers: KeyModifiers::ALT })
        );
        assert_eq!(
            KeyBinding::parse("ctrl-shift-t"),
            Some(KeyBinding { code: KeyCode::Char('t'), modifiers: KeyModifiers::CONTROL | KeyModifiers::SHIFT })
        );
        assert_eq!(KeyBinding::parse("-").map(|b| b.code), Some(KeyCode::Char('-')));
        assert_eq!(KeyBinding::parse("space").map(|b| b.code), Some(KeyCode::Char(' ')));
        assert_eq!(KeyBinding::parse("hyper-x"), None);
        assert_eq!(KeyBinding::parse("nope"), None);
    }

    #[test]
    fn test_default_keymap_dispatch() {
        let keymap = Keymap::default();
        assert_eq!(keymap.action_for(&key(KeyCode::Char('q'), KeyModifiers::NONE)), Some(Action::Quit));
        assert_eq!(keymap.action_for(&key(KeyCode::Up, KeyModifiers::NONE)), Some(Action::CursorUp));
        assert_eq!(keymap.action_for(&key(KeyCode::Up, KeyModifiers::ALT)), Some(Action::MoveUp));
        assert_eq!(keymap.action_for(&key(KeyCode::Left, KeyModifiers::SHIFT)), Some(Action::CalendarLeft));
        // '?' arrives with SHIFT on most terminals
        assert_eq!(keymap.action_for(&key(KeyCode::Char('?'), KeyModifiers::SHIFT)), Some(Action::Help));
        assert_eq!(keymap.action_for(&key(KeyCode::Char('Q'), KeyModifiers::SHIFT)), None);
        assert_eq!(keymap.action_for(&key(KeyCode::Char('q'), KeyModifiers::CONTROL)), None);
        assert!(keymap.invalid_bindings().is_empty());
    }

    #[test]
    fn test_load_config_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = load_config(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[keymap]\nquit = \"ctrl-q\"\n\n[view]\ngroup_by_priority = false\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.keymap.quit, "ctrl-q");
        assert_eq!(config.keymap.add, "a");
        assert!(!config.view.group_by_priority);
        assert_eq!(config.view.tick_rate_ms, 250);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "keymap = 3").unwrap();
        assert!(load_config(&path).is_err());
    }
}
