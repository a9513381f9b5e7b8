use crate::braille::BrailleCanvas;
use crate::data::{MetricTable, RegionGeometry};
use crate::map::choropleth::{hex_rgb, ChoroplethLayer, FeatureStyle, Popup, BORDER_COLOR};
use crate::map::geometry::draw_dashed_line;
use crate::map::projection::Viewport;
use glam::DVec2;
use rayon::prelude::*;

/// Colour under the choropleth (stands in for the tile basemap)
pub const BASEMAP_RGB: (u8, u8, u8) = (28, 32, 40);

/// Display settings for map layers
#[derive(Clone, Debug)]
pub struct DisplaySettings {
    pub show_borders: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { show_borders: true }
    }
}

/// One frame of rasterized map output
pub struct MapLayers {
    pub width: usize,
    pub height: usize,
    /// Row-major cell backgrounds; `None` outside every region
    pub fill: Vec<Option<(u8, u8, u8)>>,
    pub borders: BrailleCanvas,
    pub border_rgb: (u8, u8, u8),
}

impl MapLayers {
    pub fn fill_at(&self, cx: usize, cy: usize) -> Option<(u8, u8, u8)> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        self.fill[cy * self.width + cx]
    }
}

/// Owns the single active choropleth layer and the popup opened on it
pub struct MapRenderer {
    active: Option<ChoroplethLayer>,
    open_popup: Option<usize>,
    next_layer_id: u64,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            active: None,
            open_popup: None,
            next_layer_id: 1,
            settings: DisplaySettings::default(),
        }
    }

    /// Style `geometry` with `table` and make it the displayed layer.
    /// The previous layer and its popup are disposed first.
    pub fn replace_layer(&mut self, metric: &str, table: &MetricTable, geometry: RegionGeometry) -> u64 {
        if let Some(old) = self.active.take() {
            log::debug!("disposing layer {} ({})", old.id(), old.metric());
        }
        self.open_popup = None;

        let id = self.next_layer_id;
        self.next_layer_id += 1;

        let layer = ChoroplethLayer::build(id, metric, table, geometry);
        log::info!(
            "attached layer {} ({}): {} regions",
            id,
            metric,
            layer.features().len()
        );
        self.active = Some(layer);
        id
    }

    pub fn active_layer(&self) -> Option<&ChoroplethLayer> {
        self.active.as_ref()
    }

    /// Number of layers currently attached (0 or 1)
    pub fn attached_layers(&self) -> usize {
        usize::from(self.active.is_some())
    }

    /// Open the popup of the region at (lon, lat); closes it when nothing is there
    pub fn open_popup_at(&mut self, lon: f64, lat: f64) -> Option<&Popup> {
        self.open_popup = self
            .active
            .as_ref()
            .and_then(|layer| layer.feature_at(lon, lat))
            .map(|f| f.region);
        self.popup()
    }

    pub fn close_popup(&mut self) {
        self.open_popup = None;
    }

    pub fn popup(&self) -> Option<&Popup> {
        let layer = self.active.as_ref()?;
        let idx = self.open_popup?;
        layer.features().get(idx).map(|f| &f.popup)
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    /// Rasterize the active layer onto a `width` x `height` character grid
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport) -> MapLayers {
        let mut layers = MapLayers {
            width,
            height,
            fill: vec![None; width * height],
            borders: BrailleCanvas::new(width, height),
            border_rgb: hex_rgb(BORDER_COLOR).unwrap_or((255, 255, 255)),
        };

        let Some(layer) = self.active.as_ref() else {
            return layers;
        };

        // Sample each cell at the centre of its 2x4 dot block
        layers
            .fill
            .par_chunks_mut(width.max(1))
            .enumerate()
            .for_each(|(cy, row)| {
                for (cx, cell) in row.iter_mut().enumerate() {
                    let px = cx as f64 * 2.0 + 1.0;
                    let py = cy as f64 * 4.0 + 2.0;
                    let (lon, lat) = viewport.unproject_f(px, py);
                    *cell = layer
                        .feature_at(lon, lat)
                        .map(|f| blend(f.style, BASEMAP_RGB));
                }
            });

        if self.settings.show_borders {
            for feature in layer.features() {
                if let Some(region) = layer.geometry().get(feature.region) {
                    for polygon in &region.polygons {
                        for ring in polygon.rings() {
                            draw_ring(&mut layers.borders, ring, viewport, feature.style.dash);
                        }
                    }
                }
            }
        }

        layers
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Alpha-blend a style's fill over the basemap
pub fn blend(style: FeatureStyle, base: (u8, u8, u8)) -> (u8, u8, u8) {
    let Some((r, g, b)) = hex_rgb(style.fill_color) else {
        return base;
    };
    let a = style.fill_opacity.clamp(0.0, 1.0);
    let mix = |top: u8, bottom: u8| (top as f64 * a + bottom as f64 * (1.0 - a)).round() as u8;
    (mix(r, base.0), mix(g, base.1), mix(b, base.2))
}

/// Draw one ring, clipping each edge to the canvas
fn draw_ring(canvas: &mut BrailleCanvas, ring: &[DVec2], viewport: &Viewport, dash: Option<u32>) {
    if ring.len() < 2 {
        return;
    }

    let bounds = (canvas.width() as f64 * 2.0, canvas.height() as f64 * 4.0);
    let mut phase: u32 = 0;

    for edge in ring.windows(2) {
        let (a, b) = (edge[0], edge[1]);
        // Antimeridian wrap
        if (b.x - a.x).abs() > 180.0 {
            continue;
        }
        let from = viewport.project_f(a.x, a.y);
        let to = viewport.project_f(b.x, b.y);
        let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs());

        match clip_segment(from, to, bounds) {
            Some((t0, t1)) => {
                let at = |t: f64| (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t);
                let (x0, y0) = at(t0);
                let (x1, y1) = at(t1);
                // Keep the dash pattern aligned with the unclipped edge
                phase = phase.wrapping_add((steps * t0) as u32);
                draw_dashed_line(canvas, x0 as i32, y0 as i32, x1 as i32, y1 as i32, dash, &mut phase);
                phase = phase.wrapping_add((steps * (1.0 - t1)) as u32);
            }
            None => phase = phase.wrapping_add(steps as u32),
        }
    }
}

/// Liang-Barsky clip of the segment `a`-`b` to `[0, w) x [0, h)`.
/// Returns the visible parameter range, `None` when nothing is visible.
fn clip_segment(a: (f64, f64), b: (f64, f64), (w, h): (f64, f64)) -> Option<(f64, f64)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let max_x = w - 1e-6;
    let max_y = h - 1e-6;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for (p, q) in [(-dx, a.0), (dx, max_x - a.0), (-dy, a.1), (dy, max_y - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((t0, t1))
}
