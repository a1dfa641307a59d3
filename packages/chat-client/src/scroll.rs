//! Scroll position bookkeeping for upward-growing message lists.

/// Scroll geometry captured right before older messages are prepended.
///
/// After the prepend the content is taller by exactly the new rows, so
/// shifting the scroll offset by the height delta keeps the previously
/// visible message in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    scroll_height: f64,
    scroll_top: f64,
}

impl ScrollAnchor {
    pub fn capture(scroll_height: f64, scroll_top: f64) -> Self {
        Self {
            scroll_height,
            scroll_top,
        }
    }

    /// Scroll offset to apply once the content measures `new_scroll_height`.
    pub fn restore(&self, new_scroll_height: f64) -> f64 {
        (self.scroll_top + (new_scroll_height - self.scroll_height)).max(0.0)
    }
}

/// Whether the viewport reached the top of the list.
pub fn at_top(scroll_top: f64) -> bool {
    scroll_top <= 0.0
}
