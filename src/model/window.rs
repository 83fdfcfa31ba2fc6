use serde::{Deserialize, Serialize};

/// Saved document window dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: f64,
    pub height: f64,
}

impl WindowSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
