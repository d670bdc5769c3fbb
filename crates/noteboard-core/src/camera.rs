//! Viewport camera and the visible-bounds tracker.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest zoom the camera allows by default.
pub const MIN_ZOOM: f64 = 0.1;
/// Largest zoom the camera allows by default.
pub const MAX_ZOOM: f64 = 3.0;

/// Pan and zoom of the board view.
///
/// Screen and world coordinates are related by
/// `world = (screen - offset) / zoom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Pan, in screen pixels.
    pub offset: Vec2,
    /// Scale factor; 1.0 shows world units as pixels.
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Camera {
    /// Identity camera with the default zoom range.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera with a custom zoom range. Bounds are put in order;
    /// a non-finite or non-positive bound takes its default.
    pub fn with_zoom_range(min_zoom: f64, max_zoom: f64) -> Self {
        let sane = |z: f64, fallback: f64| if z.is_finite() && z > 0.0 { z } else { fallback };
        let (a, b) = (sane(min_zoom, MIN_ZOOM), sane(max_zoom, MAX_ZOOM));
        let (min_zoom, max_zoom) = (a.min(b), a.max(b));
        Self {
            min_zoom,
            max_zoom,
            zoom: 1.0_f64.clamp(min_zoom, max_zoom),
            ..Self::default()
        }
    }

    /// World-to-screen transform handed to the renderer.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen-to-world transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset)
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        ((screen.to_vec2() - self.offset) / self.zoom).to_point()
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        (world.to_vec2() * self.zoom + self.offset).to_point()
    }

    /// Convert a screen-space length (e.g. a hit tolerance) to world units.
    pub fn screen_to_world_len(&self, len: f64) -> f64 {
        len / self.zoom
    }

    /// Translate the view by a screen-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping the world point under `screen_point` fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        self.set_zoom_at(screen_point, self.zoom * factor);
    }

    /// Set an absolute zoom level, keeping the world point under
    /// `screen_point` fixed. The level is clamped to the zoom range.
    pub fn set_zoom_at(&mut self, screen_point: Point, zoom: f64) {
        if !zoom.is_finite() {
            return;
        }
        let new_zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        if new_zoom == self.zoom {
            return;
        }
        let anchor = self.screen_to_world(screen_point);
        self.zoom = new_zoom;
        self.offset = screen_point.to_vec2() - anchor.to_vec2() * new_zoom;
    }

    /// Back to the origin at 100% (or the nearest allowed zoom).
    pub fn reset(&mut self) {
        self.offset = Vec2::ZERO;
        self.zoom = 1.0_f64.clamp(self.min_zoom, self.max_zoom);
    }

    /// Zoom and pan so `bounds` fills the viewport minus `padding` on each
    /// side, centered.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }
        let avail_w = (viewport.width - 2.0 * padding).max(1.0);
        let avail_h = (viewport.height - 2.0 * padding).max(1.0);
        self.zoom = (avail_w / bounds.width())
            .min(avail_h / bounds.height())
            .clamp(self.min_zoom, self.max_zoom);
        let screen_center = Vec2::new(viewport.width, viewport.height) / 2.0;
        self.offset = screen_center - bounds.center().to_vec2() * self.zoom;
    }

    /// World-space rectangle covered by a viewport of the given size.
    pub fn visible_world_rect(&self, viewport: Size) -> Rect {
        let top_left = self.screen_to_world(Point::ZERO);
        let bottom_right = self.screen_to_world(Point::new(viewport.width, viewport.height));
        Rect::from_points(top_left, bottom_right)
    }
}

/// Tracks the padded visible-bounds rectangle used for virtualized rendering.
///
/// The rectangle is only recomputed once the camera has moved past a small
/// threshold, so a steady camera never churns it.
#[derive(Debug, Clone)]
pub struct VisibleBounds {
    padding: f64,
    pan_threshold: f64,
    zoom_threshold: f64,
    last: Option<(Vec2, f64, Size)>,
    bounds: Rect,
}

impl VisibleBounds {
    pub fn new(padding: f64, pan_threshold: f64, zoom_threshold: f64) -> Self {
        Self {
            padding,
            pan_threshold,
            zoom_threshold,
            last: None,
            bounds: Rect::ZERO,
        }
    }

    /// Current padded visible rectangle in world coordinates.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Recompute the bounds if the camera or viewport moved enough.
    /// Returns true if the bounds changed.
    pub fn update(&mut self, camera: &Camera, viewport: Size) -> bool {
        if let Some((offset, zoom, size)) = self.last {
            let panned = (camera.offset - offset).hypot() > self.pan_threshold;
            let zoomed = (camera.zoom - zoom).abs() > self.zoom_threshold;
            if !panned && !zoomed && size == viewport {
                return false;
            }
        }
        self.bounds = camera
            .visible_world_rect(viewport)
            .inflate(self.padding, self.padding);
        self.last = Some((camera.offset, camera.zoom, viewport));
        true
    }

    /// Force the next [`update`](Self::update) to recompute.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    /// Whether an item with `bounds` should stay materialized. An item in
    /// text-edit mode is always kept regardless of visibility.
    pub fn should_materialize(&self, bounds: Rect, editing: bool) -> bool {
        editing || crate::items::rects_touch(self.bounds, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_to_world() {
        let camera = Camera {
            offset: Vec2::new(40.0, -60.0),
            zoom: 2.0,
            ..Camera::default()
        };
        assert_eq!(camera.screen_to_world(Point::new(140.0, 40.0)), Point::new(50.0, 50.0));
        assert_eq!(camera.world_to_screen(Point::new(50.0, 50.0)), Point::new(140.0, 40.0));
        assert_eq!(camera.screen_to_world_len(10.0), 5.0);
    }

    #[test]
    fn test_transform_matches_world_to_screen() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(12.0, 7.0);
        camera.zoom = 0.75;
        let world = Point::new(40.0, -10.0);
        let via_affine = camera.transform() * world;
        let direct = camera.world_to_screen(world);
        assert!((via_affine - direct).hypot() < 1e-10);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut camera = Camera::new();
        camera.offset = Vec2::new(-37.0, 81.0);
        camera.zoom = 1.3;

        for (anchor, factor) in [
            (Point::new(0.0, 0.0), 1.1),
            (Point::new(640.0, 360.0), 0.5),
            (Point::new(-20.0, 900.0), 2.7),
            (Point::new(333.3, 12.5), 100.0),
        ] {
            let before = camera.screen_to_world(anchor);
            camera.zoom_at(anchor, factor);
            let after = camera.screen_to_world(anchor);
            assert!((before - after).hypot() < 1e-9, "anchor drifted at {anchor:?}");
        }
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.zoom - MIN_ZOOM).abs() < f64::EPSILON);

        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.zoom - MAX_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_range_is_ordered_and_sanitized() {
        let camera = Camera::with_zoom_range(3.0, 0.5);
        assert_eq!((camera.min_zoom, camera.max_zoom), (0.5, 3.0));
        assert_eq!(camera.zoom, 1.0);

        let camera = Camera::with_zoom_range(f64::NAN, -2.0);
        assert_eq!((camera.min_zoom, camera.max_zoom), (MIN_ZOOM, MAX_ZOOM));
    }

    #[test]
    fn test_non_finite_zoom_is_ignored() {
        let mut camera = Camera::new();
        camera.set_zoom_at(Point::ZERO, f64::NAN);
        assert!((camera.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_is_pure_translation() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 2.0);
        camera.pan(Vec2::new(-8.0, 14.0));
        assert_eq!(camera.offset, Vec2::new(-8.0, 14.0));
        assert_eq!(camera.zoom, 2.0);
    }

    #[test]
    fn test_fit_to_bounds_centers_content() {
        let mut camera = Camera::new();
        let bounds = Rect::new(0.0, 0.0, 400.0, 200.0);
        let viewport = Size::new(800.0, 600.0);
        camera.fit_to_bounds(bounds, viewport, 0.0);
        assert!((camera.zoom - 2.0).abs() < 1e-9);
        let center = camera.world_to_screen(bounds.center());
        assert!((center.x - 400.0).abs() < 1e-9);
        assert!((center.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_visible_bounds_threshold() {
        let mut camera = Camera::new();
        let viewport = Size::new(800.0, 600.0);
        let mut visible = VisibleBounds::new(500.0, 1.0, 0.001);

        assert!(visible.update(&camera, viewport));
        assert_eq!(visible.bounds(), Rect::new(-500.0, -500.0, 1300.0, 1100.0));

        camera.pan(Vec2::new(0.5, 0.0));
        assert!(!visible.update(&camera, viewport));

        camera.pan(Vec2::new(5.0, 0.0));
        assert!(visible.update(&camera, viewport));
    }

    #[test]
    fn test_editing_item_always_materialized() {
        let camera = Camera::new();
        let mut visible = VisibleBounds::new(0.0, 1.0, 0.001);
        visible.update(&camera, Size::new(100.0, 100.0));
        let far = Rect::new(5000.0, 5000.0, 5100.0, 5100.0);
        assert!(!visible.should_materialize(far, false));
        assert!(visible.should_materialize(far, true));
    }
}
