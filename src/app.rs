use crate::chart::BarChartView;
use crate::config::{AppConfig, MetricSource};
use crate::data::{load_boundaries, load_frequency, load_metric, FrequencyTable, MetricTable, RegionGeometry};
use crate::error::LoadError;
use crate::map::{MapRenderer, Popup, Viewport};
use crate::source::Resource;
use ratatui::layout::Rect;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Result of one background load job
pub enum LoadEvent {
    /// Metric CSV plus boundaries for the map
    Metric {
        name: String,
        result: Result<(MetricTable, RegionGeometry), LoadError>,
    },
    /// Frequency CSV used to populate the region and group selectors
    Selectors(Result<FrequencyTable, LoadError>),
    /// Frequency CSV fetched for one chart update
    Chart {
        region: String,
        group: String,
        result: Result<FrequencyTable, LoadError>,
    },
}

/// Which selector receives `[` / `]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Metric,
    Region,
    Group,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Metric => Focus::Region,
            Focus::Region => Focus::Group,
            Focus::Group => Focus::Metric,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Metric => Focus::Group,
            Focus::Region => Focus::Metric,
            Focus::Group => Focus::Region,
        }
    }
}

/// A dropdown-style list with one selected entry
#[derive(Clone, Debug, Default)]
pub struct Selector<T> {
    items: Vec<T>,
    selected: usize,
}

impl<T> Selector<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, selected: 0 }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn selected(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub fn index(&self) -> usize {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Step forward (wrapping); false when there is nothing to change
    pub fn next(&mut self) -> bool {
        if self.items.len() < 2 {
            return false;
        }
        self.selected = (self.selected + 1) % self.items.len();
        true
    }

    pub fn prev(&mut self) -> bool {
        if self.items.len() < 2 {
            return false;
        }
        self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        true
    }
}

/// Session controller: owns the map, the chart, the selectors and the
/// channel that background loads report back on
pub struct App {
    pub config: AppConfig,
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub chart: BarChartView,
    pub metrics: Selector<MetricSource>,
    pub regions: Selector<String>,
    pub groups: Selector<String>,
    pub focus: Focus,
    pub should_quit: bool,
    /// Inner map rectangle in terminal cells
    pub map_area: Rect,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Jobs spawned but not yet applied
    pub pending: usize,
    tx: Sender<LoadEvent>,
    rx: Receiver<LoadEvent>,
}

impl App {
    pub fn new(config: AppConfig, width: u16, height: u16) -> Self {
        let map_area = crate::ui::map_inner(Rect::new(0, 0, width, height));
        let viewport = Viewport::new(
            config.view.center_lon,
            config.view.center_lat,
            config.view.zoom,
            map_area.width as usize * 2,
            map_area.height as usize * 4,
        );
        let (tx, rx) = channel();

        Self {
            metrics: Selector::new(config.metrics.clone()),
            config,
            viewport,
            map_renderer: MapRenderer::new(),
            chart: BarChartView::new(),
            regions: Selector::default(),
            groups: Selector::default(),
            focus: Focus::Metric,
            should_quit: false,
            map_area,
            last_mouse: None,
            pending: 0,
            tx,
            rx,
        }
    }

    /// Kick off the initial map and selector loads
    pub fn start(&mut self) {
        self.request_metric();
        self.request_selectors();
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: u16, height: u16) {
        self.map_area = crate::ui::map_inner(Rect::new(0, 0, width, height));
        self.viewport.width = self.map_area.width as usize * 2;
        self.viewport.height = self.map_area.height as usize * 4;
    }

    fn spawn<F>(&mut self, job: F)
    where
        F: FnOnce() -> LoadEvent + Send + 'static,
    {
        self.pending += 1;
        let tx = self.tx.clone();
        rayon::spawn(move || {
            // The receiver only goes away on shutdown
            let _ = tx.send(job());
        });
    }

    /// Fetch the selected metric, then the boundaries, and re-render the map
    pub fn request_metric(&mut self) {
        let Some(metric) = self.metrics.selected().cloned() else {
            return;
        };
        let boundaries = Resource::parse(&self.config.boundaries);
        log::info!("loading metric {:?} from {}", metric.name, metric.file);

        self.spawn(move || LoadEvent::Metric {
            result: load_metric_layer(&Resource::parse(&metric.file), &boundaries),
            name: metric.name,
        });
    }

    /// Fetch the frequency CSV to fill the region and group selectors
    pub fn request_selectors(&mut self) {
        let resource = Resource::parse(&self.config.frequency);
        self.spawn(move || LoadEvent::Selectors(load_frequency(&resource)));
    }

    /// Fetch the frequency CSV for the selected region and group
    pub fn request_chart(&mut self) {
        let (Some(region), Some(group)) = (self.regions.selected().cloned(), self.groups.selected().cloned())
        else {
            return;
        };
        let resource = Resource::parse(&self.config.frequency);
        self.spawn(move || LoadEvent::Chart {
            result: load_frequency(&resource),
            region,
            group,
        });
    }

    /// Apply every finished job, in arrival order
    pub fn poll_loads(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.apply(event);
        }
    }

    /// Apply one load result. Failures are logged and leave the current
    /// map and chart untouched.
    pub fn apply(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Metric { name, result } => match result {
                Ok((table, geometry)) => {
                    self.map_renderer.replace_layer(&name, &table, geometry);
                }
                Err(e) => log::error!("metric {:?} not rendered: {}", name, e),
            },
            LoadEvent::Selectors(result) => match result {
                Ok(table) => {
                    self.regions = Selector::new(table.regions());
                    self.groups = Selector::new(table.group_names().to_vec());
                    log::info!(
                        "selectors: {} regions, {} groups",
                        self.regions.items().len(),
                        self.groups.items().len()
                    );
                    self.request_chart();
                }
                Err(e) => log::error!("selectors not populated: {}", e),
            },
            LoadEvent::Chart { region, group, result } => match result {
                Ok(table) => self.chart.replace(table.bin_series(&region, &group)),
                Err(e) => log::error!("chart for {:?}/{:?} not rendered: {}", region, group, e),
            },
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Step the focused selector and reload what depends on it
    pub fn step_selection(&mut self, forward: bool) {
        let changed = match self.focus {
            Focus::Metric => step(&mut self.metrics, forward),
            Focus::Region => step(&mut self.regions, forward),
            Focus::Group => step(&mut self.groups, forward),
        };
        if !changed {
            return;
        }
        match self.focus {
            Focus::Metric => self.request_metric(),
            Focus::Region | Focus::Group => self.request_chart(),
        }
    }

    /// Re-fetch everything for the current selections
    pub fn reload(&mut self) {
        self.request_metric();
        self.request_chart();
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a terminal position
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.pixel_at(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    /// Zoom out from a terminal position
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.pixel_at(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Fit the view to the active layer's regions
    pub fn fit_to_layer(&mut self) {
        if let Some(bounds) = self
            .map_renderer
            .active_layer()
            .and_then(|layer| layer.geometry().bounds())
        {
            self.viewport.fit_bounds(bounds);
        }
    }

    /// Open the popup of the region under a terminal position
    pub fn open_popup_at(&mut self, col: u16, row: u16) -> Option<&Popup> {
        let Some((px, py)) = self.pixel_at(col, row) else {
            self.map_renderer.close_popup();
            return None;
        };
        let (lon, lat) = self.viewport.unproject(px, py);
        self.map_renderer.open_popup_at(lon, lat)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Pan by the mouse movement since the last drag event
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (last_x as i32 - x as i32) * 2;
            let dy = (last_y as i32 - y as i32) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Terminal cell to braille pixel (cell centre), `None` outside the map
    fn pixel_at(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
            return None;
        }
        let px = (col - area.x) as i32 * 2 + 1;
        let py = (row - area.y) as i32 * 4 + 2;
        Some((px, py))
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

fn step<T>(selector: &mut Selector<T>, forward: bool) -> bool {
    if forward {
        selector.next()
    } else {
        selector.prev()
    }
}

/// Metric CSV first, then boundaries; the first failure aborts the job
pub fn load_metric_layer(
    metric: &Resource,
    boundaries: &Resource,
) -> Result<(MetricTable, RegionGeometry), LoadError> {
    let table = load_metric(metric)?;
    log::debug!("metric data: {:?}", table);
    let geometry = load_boundaries(boundaries)?;
    Ok((table, geometry))
}
