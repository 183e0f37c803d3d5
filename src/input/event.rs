//! Input event types

use serde::{Deserialize, Serialize};

/// Horizontal response direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Arrow glyph used when rendering flanker rows
    pub fn arrow(self) -> char {
        match self {
            Self::Left => '←',
            Self::Right => '→',
        }
    }
}

/// Where an input came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Physical key press
    Keyboard,
    /// Pointer or touch press inside a screen zone
    Pointer,
    /// Click on an on-screen response button
    Click,
    /// Synthesized when the response window closes without input
    Timeout,
}

/// Logical response after device-specific mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKey {
    Left,
    Right,
    /// Generic "I saw it" response (space, enter, click)
    Space,
}

impl ResponseKey {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            Self::Space => None,
        }
    }
}

impl From<Direction> for ResponseKey {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::Left,
            Direction::Right => Self::Right,
        }
    }
}

/// A single normalized input with timing information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputEvent {
    /// Source of the event
    #[serde(rename = "type")]
    pub kind: InputKind,
    /// Logical key, if the source carries one
    pub key: Option<ResponseKey>,
    /// Monotonic milliseconds when the event was captured
    pub timestamp: f64,
    /// Milliseconds from stimulus onset, filled in by the engine
    pub response_time: f64,
    /// False only for synthesized timeouts
    pub has_response: bool,
    /// Set by the engine when the input arrived before the stimulus appeared
    #[serde(default)]
    pub before_onset: bool,
}

impl InputEvent {
    fn new(kind: InputKind, key: Option<ResponseKey>, timestamp: f64, has_response: bool) -> Self {
        Self {
            kind,
            key,
            timestamp,
            response_time: 0.0,
            has_response,
            before_onset: false,
        }
    }

    pub fn keyboard(key: ResponseKey, timestamp: f64) -> Self {
        Self::new(InputKind::Keyboard, Some(key), timestamp, true)
    }

    pub fn pointer(side: Direction, timestamp: f64) -> Self {
        Self::new(InputKind::Pointer, Some(side.into()), timestamp, true)
    }

    pub fn click(timestamp: f64) -> Self {
        Self::new(InputKind::Click, Some(ResponseKey::Space), timestamp, true)
    }

    pub fn timeout(timestamp: f64) -> Self {
        Self::new(InputKind::Timeout, None, timestamp, false)
    }

    pub fn with_response_time(mut self, response_time: f64) -> Self {
        self.response_time = response_time;
        self
    }

    /// Normalized left/right reading of the event, if any
    pub fn direction(&self) -> Option<Direction> {
        self.key.and_then(ResponseKey::direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_zone_maps_to_direction() {
        let event = InputEvent::pointer(Direction::Left, 12.0);
        assert_eq!(event.kind, InputKind::Pointer);
        assert_eq!(event.direction(), Some(Direction::Left));
        assert!(event.has_response);
    }

    #[test]
    fn timeout_has_no_response() {
        let event = InputEvent::timeout(1000.0);
        assert!(!event.has_response);
        assert_eq!(event.key, None);
        assert_eq!(event.direction(), None);
    }

    #[test]
    fn space_has_no_direction() {
        assert_eq!(ResponseKey::Space.direction(), None);
        assert_eq!(InputEvent::click(0.0).direction(), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = InputEvent::keyboard(ResponseKey::Right, 5.0).with_response_time(320.0);
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"keyboard\""));
        assert!(json.contains("\"responseTime\":320.0"));
        assert!(json.contains("\"hasResponse\":true"));
    }
}
