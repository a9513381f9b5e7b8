use crate::data::BBox;
use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 200.0;

/// Web Mercator x in [0, 1]
#[inline(always)]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Web Mercator y in [0, 1], 0 at the north edge
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.0511, 85.0511) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline(always)]
fn inverse_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level; the world is `zoom * width` pixels wide
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width,
            height,
        }
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = self.zoom * self.width.max(1) as f64;
        self.center_lon += dx as f64 * 360.0 / scale;
        self.center_lat = inverse_mercator_y(mercator_y(self.center_lat) + dy as f64 / scale);

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor while keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Center and zoom so the bounding box fills most of the canvas
    pub fn fit_bounds(&mut self, bbox: BBox) {
        let (min_lon, min_lat, max_lon, max_lat) = bbox;
        if !(min_lon <= max_lon && min_lat <= max_lat) || self.width == 0 || self.height == 0 {
            return;
        }

        let x0 = mercator_x(min_lon);
        let x1 = mercator_x(max_lon);
        // North edge has the smaller y
        let y0 = mercator_y(max_lat);
        let y1 = mercator_y(min_lat);

        self.center_lon = (min_lon + max_lon) / 2.0;
        self.center_lat = inverse_mercator_y((y0 + y1) / 2.0);

        let span_x = (x1 - x0).max(1e-9);
        let span_y = (y1 - y0).max(1e-9);
        let fit_x = 0.9 / span_x;
        let fit_y = 0.9 * self.height as f64 / (span_y * self.width as f64);
        self.zoom = fit_x.min(fit_y).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        self.unproject_f(px as f64, py as f64)
    }

    /// Sub-pixel unprojection, used when sampling cell centres
    pub fn unproject_f(&self, px: f64, py: f64) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        let x = (px - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);

        (x * 360.0 - 180.0, inverse_mercator_y(y))
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (px, py) = self.project_f(lon, lat);
        (px as i32, py as i32)
    }

    /// Sub-pixel projection, used for clipping border segments
    pub fn project_f(&self, lon: f64, lat: f64) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;

        (px, py)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let vp = Viewport::new(-96.0, 37.8, 5.0, 400, 200);
        let (px, py) = vp.project(-100.0, 40.0);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon + 100.0).abs() < 0.5);
        assert!((lat - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_fit_bounds_keeps_box_on_canvas() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 200, 100);
        vp.fit_bounds((-125.0, 25.0, -67.0, 49.0));

        for (lon, lat) in [(-125.0, 25.0), (-67.0, 49.0), (-125.0, 49.0), (-67.0, 25.0)] {
            let (px, py) = vp.project(lon, lat);
            assert!((0..200).contains(&px), "x {} out of canvas", px);
            assert!((0..100).contains(&py), "y {} out of canvas", py);
        }
        assert!(vp.zoom > 1.0);
    }

    #[test]
    fn test_zoom_at_keeps_point_fixed() {
        let mut vp = Viewport::new(0.0, 0.0, 2.0, 200, 100);
        let before = vp.unproject(150, 30);
        vp.zoom_in_at(150, 30);
        let after = vp.unproject(150, 30);
        assert!((before.0 - after.0).abs() < 2.0);
        assert!((before.1 - after.1).abs() < 2.0);
    }
}
