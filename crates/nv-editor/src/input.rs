//! Pointer input model.
//!
//! Hosts translate their toolkit's mouse events into `PointerEvent`s in
//! scene coordinates before handing them to the controller.

use kurbo::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// A pointer event in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    /// Button pressed.
    Press { button: PointerButton, position: Point },
    /// Pointer moved, with or without a button held.
    Move { position: Point },
    /// Button released.
    Release { button: PointerButton, position: Point },
}

impl PointerEvent {
    pub fn from_pointer_down(button: PointerButton, x: f64, y: f64) -> Self {
        Self::Press {
            button,
            position: Point::new(x, y),
        }
    }

    pub fn from_pointer_move(x: f64, y: f64) -> Self {
        Self::Move {
            position: Point::new(x, y),
        }
    }

    pub fn from_pointer_up(button: PointerButton, x: f64, y: f64) -> Self {
        Self::Release {
            button,
            position: Point::new(x, y),
        }
    }

    pub fn position(&self) -> Point {
        match self {
            Self::Press { position, .. } | Self::Move { position } | Self::Release { position, .. } => *position,
        }
    }

    /// The button that changed state; `None` for moves.
    pub fn button(&self) -> Option<PointerButton> {
        match self {
            Self::Press { button, .. } | Self::Release { button, .. } => Some(*button),
            Self::Move { .. } => None,
        }
    }
}
