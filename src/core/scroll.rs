//! Scrollbar geometry
//!
//! Maps between the viewport's position in the logical buffer, the thumb
//! rectangle drawn in the scrollbar gutter, and pointer clicks in that gutter.
//! Nothing here owns state; the resulting top row is handed back to the grid
//! source.

use super::grid::ViewportGeometry;

/// Scrollbar thumb in window pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThumbRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ThumbRect {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Conversions between scroll fraction, thumb rectangle and top row
pub struct ScrollMapper;

impl ScrollMapper {
    /// Thumb for `geometry` in a gutter starting at `gutter_left`, `gutter_width`
    /// wide, in a client area `client_height` pixels tall
    pub fn thumb_rect(
        geometry: &ViewportGeometry,
        gutter_left: f32,
        gutter_width: f32,
        client_height: f32,
    ) -> ThumbRect {
        let buffer_height = geometry.buffer_height.max(geometry.height);
        if buffer_height == 0 {
            return ThumbRect {
                left: gutter_left,
                top: 0.0,
                width: gutter_width,
                height: client_height,
            };
        }
        let buffer_height = buffer_height as f32;
        ThumbRect {
            left: gutter_left,
            top: geometry.origin_y as f32 / buffer_height * client_height,
            width: gutter_width,
            height: geometry.height as f32 / buffer_height * client_height,
        }
    }

    /// Scroll fraction for a click at `click_y`, clamped to `[0, 1]`
    pub fn rect_to_fraction(click_y: f32, client_height: f32, thumb: &ThumbRect) -> f32 {
        let travel = client_height - thumb.height;
        if travel <= 0.0 {
            return 0.0;
        }
        (click_y / travel).clamp(0.0, 1.0)
    }

    /// Buffer row to show at the top of the window for `fraction`
    pub fn fraction_to_top_row(fraction: f32, buffer_height: usize, view_height: usize) -> usize {
        let range = buffer_height.saturating_sub(view_height) as f32;
        (fraction.clamp(0.0, 1.0) * range).round() as usize
    }

    /// Check if a click lands in the scrollbar gutter above the thumb's bottom edge
    pub fn is_scroll_click(x: f32, y: f32, text_width: f32, thumb: &ThumbRect) -> bool {
        x >= text_width && y >= 0.0 && y < thumb.bottom()
    }

    /// Top row requested by a click, or `None` when the click is not a scroll request
    pub fn top_row_for_click(
        x: f32,
        y: f32,
        text_width: f32,
        client_height: f32,
        thumb: &ThumbRect,
        geometry: &ViewportGeometry,
    ) -> Option<usize> {
        if !Self::is_scroll_click(x, y, text_width, thumb) {
            return None;
        }
        let fraction = Self::rect_to_fraction(y, client_height, thumb);
        Some(Self::fraction_to_top_row(
            fraction,
            geometry.buffer_height,
            geometry.height,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn geometry(origin_y: usize, height: usize, buffer_height: usize) -> ViewportGeometry {
        ViewportGeometry {
            origin_x: 0,
            origin_y,
            width: 80,
            height,
            buffer_width: 80,
            buffer_height,
        }
    }

    #[test]
    fn test_thumb_rect_proportions() {
        // 25 of 100 rows visible, scrolled to row 50, 400px tall client
        let thumb = ScrollMapper::thumb_rect(&geometry(50, 25, 100), 640.0, 8.0, 400.0);
        assert_eq!(thumb.left, 640.0);
        assert_eq!(thumb.width, 8.0);
        assert_eq!(thumb.top, 200.0);
        assert_eq!(thumb.height, 100.0);
        assert_eq!(thumb.bottom(), 300.0);
    }

    #[test]
    fn test_thumb_fills_gutter_without_scrollback() {
        let thumb = ScrollMapper::thumb_rect(&geometry(0, 25, 25), 0.0, 8.0, 400.0);
        assert_eq!(thumb.top, 0.0);
        assert_eq!(thumb.height, 400.0);
    }

    #[test]
    fn test_rect_to_fraction_clamps() {
        let thumb = ThumbRect {
            left: 0.0,
            top: 0.0,
            width: 8.0,
            height: 100.0,
        };
        assert_eq!(ScrollMapper::rect_to_fraction(150.0, 400.0, &thumb), 0.5);
        assert_eq!(ScrollMapper::rect_to_fraction(-20.0, 400.0, &thumb), 0.0);
        assert_eq!(ScrollMapper::rect_to_fraction(390.0, 400.0, &thumb), 1.0);

        // Thumb as tall as the client: nowhere to travel
        let full = ThumbRect { height: 400.0, ..thumb };
        assert_eq!(ScrollMapper::rect_to_fraction(10.0, 400.0, &full), 0.0);
    }

    #[test]
    fn test_fraction_to_top_row_rounds() {
        assert_eq!(ScrollMapper::fraction_to_top_row(0.0, 100, 25), 0);
        assert_eq!(ScrollMapper::fraction_to_top_row(1.0, 100, 25), 75);
        assert_eq!(ScrollMapper::fraction_to_top_row(0.5, 100, 25), 38);
        assert_eq!(ScrollMapper::fraction_to_top_row(0.5, 20, 25), 0);
    }

    #[test]
    fn test_click_target() {
        let thumb = ThumbRect {
            left: 640.0,
            top: 100.0,
            width: 8.0,
            height: 50.0,
        };
        // Text area
        assert!(!ScrollMapper::is_scroll_click(320.0, 120.0, 640.0, &thumb));
        // Gutter, above the thumb's bottom edge
        assert!(ScrollMapper::is_scroll_click(644.0, 20.0, 640.0, &thumb));
        assert!(ScrollMapper::is_scroll_click(644.0, 149.0, 640.0, &thumb));
        // Gutter, below the thumb
        assert!(!ScrollMapper::is_scroll_click(644.0, 150.0, 640.0, &thumb));
    }

    #[test]
    fn test_top_row_for_click() {
        let geometry = geometry(0, 25, 125);
        let thumb = ScrollMapper::thumb_rect(&geometry, 640.0, 8.0, 400.0);
        assert_eq!(thumb.height, 80.0);

        assert_eq!(
            ScrollMapper::top_row_for_click(644.0, 40.0, 640.0, 400.0, &thumb, &geometry),
            Some(13)
        );
        assert_eq!(
            ScrollMapper::top_row_for_click(100.0, 40.0, 640.0, 400.0, &thumb, &geometry),
            None
        );
    }

    proptest! {
        #[test]
        fn prop_thumb_top_round_trips(
            view_height in 1usize..60,
            extra in 0usize..500,
            origin_seed in any::<u32>(),
            cell_height in 4u32..32,
        ) {
            let buffer_height = view_height + extra;
            let origin = if extra == 0 { 0 } else { origin_seed as usize % (extra + 1) };
            let geometry = geometry(origin, view_height, buffer_height);
            let client_height = (view_height as u32 * cell_height) as f32;
            let thumb = ScrollMapper::thumb_rect(&geometry, 0.0, 8.0, client_height);

            let fraction = ScrollMapper::rect_to_fraction(thumb.top, client_height, &thumb);
            let row = ScrollMapper::fraction_to_top_row(fraction, buffer_height, view_height);
            prop_assert!((row as i64 - origin as i64).abs() <= 1, "row {} origin {}", row, origin);
        }

        #[test]
        fn prop_any_click_row_round_trips(
            view_height in 1usize..60,
            extra in 0usize..500,
            cell_height in 4u32..32,
            a in 0.0f32..=1.0,
            b in 0.0f32..=1.0,
        ) {
            let buffer_height = view_height + extra;
            let client_height = (view_height as u32 * cell_height) as f32;
            let thumb = ScrollMapper::thumb_rect(&geometry(0, view_height, buffer_height), 0.0, 8.0, client_height);
            let travel = client_height - thumb.height;
            let (low, high) = if a <= b { (a * travel, b * travel) } else { (b * travel, a * travel) };

            let row_for = |y: f32| {
                let fraction = ScrollMapper::rect_to_fraction(y, client_height, &thumb);
                ScrollMapper::fraction_to_top_row(fraction, buffer_height, view_height)
            };
            let (row_low, row_high) = (row_for(low), row_for(high));
            prop_assert!(row_high <= extra, "row {} past range {}", row_high, extra);
            prop_assert!(row_low <= row_high, "rows {} > {} for y {} < {}", row_low, row_high, low, high);

            // The thumb drawn for the chosen row maps back to that row
            let moved = ScrollMapper::thumb_rect(&geometry(row_high, view_height, buffer_height), 0.0, 8.0, client_height);
            let back = row_for(moved.top);
            prop_assert!((back as i64 - row_high as i64).abs() <= 1, "row {} came back as {}", row_high, back);
        }
    }
}
