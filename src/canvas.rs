use glam::Vec2;

/// Pan/zoom state translating between screen space (pointer events) and
/// world space (layout coordinates).
#[derive(Debug, Clone)]
pub struct Viewport {
    /// World point shown at the viewport's top-left corner
    pub pan_offset: Vec2,
    /// Zoom level (0.1x to 10x)
    pub zoom_level: f32,
    /// Viewport rectangle in screen space
    pub viewport_rect: Rect,
}

const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 10.0;

impl Viewport {
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self {
            pan_offset: Vec2::ZERO,
            zoom_level: 1.0,
            viewport_rect: Rect::new(0.0, 0.0, viewport_width, viewport_height),
        }
    }

    pub fn update_viewport(&mut self, rect: Rect) {
        self.viewport_rect = rect;
    }

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan_offset -= delta / self.zoom_level;
    }

    pub fn zoom(&mut self, delta: f32, pivot: Vec2) {
        // Keep the world point under the pivot fixed
        let world_pivot = self.screen_to_world(pivot);
        self.zoom_level = (self.zoom_level + delta).clamp(MIN_ZOOM, MAX_ZOOM);
        let drifted = self.screen_to_world(pivot);
        self.pan_offset += world_pivot - drifted;
    }

    pub fn reset(&mut self) {
        self.pan_offset = Vec2::ZERO;
        self.zoom_level = 1.0;
    }

    pub fn world_to_screen(&self, world_pos: Vec2) -> Vec2 {
        (world_pos - self.pan_offset) * self.zoom_level + self.viewport_rect.min()
    }

    pub fn screen_to_world(&self, screen_pos: Vec2) -> Vec2 {
        (screen_pos - self.viewport_rect.min()) / self.zoom_level + self.pan_offset
    }

    /// Check if a world rectangle overlaps the visible viewport (with margin)
    pub fn is_in_viewport(&self, world_rect: &Rect, margin: f32) -> bool {
        let min = self.world_to_screen(world_rect.min());
        let max = self.world_to_screen(world_rect.max());
        let rect = &self.viewport_rect;

        max.x >= rect.x - margin
            && min.x <= rect.x + rect.width + margin
            && max.y >= rect.y - margin
            && min.y <= rect.y + rect.height + margin
    }
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    /// Half-open on the far edges so adjacent rects never both claim a point.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Diagram panel starting at terminal cell (42, 1)
    fn panel() -> Viewport {
        let mut view = Viewport::new(0.0, 0.0);
        view.update_viewport(Rect::new(42.0, 1.0, 120.0, 40.0));
        view
    }

    #[test]
    fn test_panel_origin_is_world_origin() {
        let view = panel();
        assert_eq!(view.world_to_screen(Vec2::ZERO), Vec2::new(42.0, 1.0));
        assert_eq!(view.screen_to_world(Vec2::new(42.0, 1.0)), Vec2::ZERO);
        assert_eq!(view.screen_to_world(Vec2::new(50.0, 4.0)), Vec2::new(8.0, 3.0));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut view = panel();
        view.zoom(1.0, Vec2::new(60.0, 10.0));
        assert_eq!(view.zoom_level, 2.0);

        view.zoom(-50.0, Vec2::new(60.0, 10.0));
        assert_eq!(view.zoom_level, MIN_ZOOM);
        view.zoom(50.0, Vec2::new(60.0, 10.0));
        assert_eq!(view.zoom_level, MAX_ZOOM);
    }

    #[test]
    fn test_zoom_keeps_pivot_fixed() {
        let mut view = panel();
        let pivot = Vec2::new(90.0, 17.0);
        let under_pointer = view.screen_to_world(pivot);

        view.zoom(1.5, pivot);
        assert!((view.screen_to_world(pivot) - under_pointer).length() < 1e-3);
        assert!((view.world_to_screen(under_pointer) - pivot).length() < 1e-3);
    }

    #[test]
    fn test_pan_moves_content_with_delta() {
        let mut view = panel();
        view.pan(Vec2::new(4.0, -2.0));
        assert_eq!(view.world_to_screen(Vec2::ZERO), Vec2::new(46.0, -1.0));

        // the same screen delta covers less world when zoomed in
        view.reset();
        view.zoom(1.0, Vec2::new(42.0, 1.0));
        view.pan(Vec2::new(4.0, 0.0));
        assert_eq!(view.pan_offset, Vec2::new(-2.0, 0.0));

        view.reset();
        assert_eq!(view.pan_offset, Vec2::ZERO);
        assert_eq!(view.zoom_level, 1.0);
    }

    #[test]
    fn test_culling_against_panel() {
        let view = panel();
        assert!(view.is_in_viewport(&Rect::new(0.0, 0.0, 22.0, 1.0), 0.0));
        assert!(!view.is_in_viewport(&Rect::new(0.0, 400.0, 22.0, 1.0), 0.0));
        // a node hanging off the left edge is still drawn
        assert!(view.is_in_viewport(&Rect::new(-10.0, 2.0, 22.0, 1.0), 0.0));
        assert!(view.is_in_viewport(&Rect::new(130.0, 2.0, 22.0, 1.0), 10.0));
    }

    #[test]
    fn test_rect_contains_half_open() {
        let rect = Rect::new(480.0, 120.0, 180.0, 48.0);
        assert!(rect.contains(Vec2::new(480.0, 120.0)));
        assert!(rect.contains(Vec2::new(659.0, 167.0)));
        assert!(!rect.contains(Vec2::new(660.0, 130.0)));
        assert!(!rect.contains(Vec2::new(500.0, 168.0)));
    }
}
