use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
}

impl KeyCode {
    pub const UP: Self = Self::Named(NamedKey::Up);
    pub const DOWN: Self = Self::Named(NamedKey::Down);
    pub const LEFT: Self = Self::Named(NamedKey::Left);
    pub const RIGHT: Self = Self::Named(NamedKey::Right);
    pub const ESCAPE: Self = Self::Named(NamedKey::Escape);

    /// Letter key, case-insensitive.
    pub fn letter(ch: char) -> Self {
        Self::Character(ch.to_ascii_uppercase())
    }
}

/// Keys the demos react to that have no character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Up,
    Down,
    Left,
    Right,
    Escape,
}

/// Input collected between two frames.
///
/// Keys stay in the held set until released. A key also lands in the pressed
/// set on the frame it goes down, which makes toggles edge triggered.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    mouse_delta: Vec2,
    scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        if self.held.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// True only on the frame the key went down.
    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Accumulates raw pointer motion in pixels, y pointing down.
    pub fn add_mouse_motion(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Accumulates wheel movement in lines, positive away from the user.
    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Clears the per-frame state; held keys survive.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll = 0.0;
    }
}
