use crate::data::{MetricTable, RegionGeometry};
use crate::map::spatial::FeatureGrid;
use std::fmt;

/// Threshold ladder, highest bound first. A value strictly above the bound
/// takes the colour.
pub const THRESHOLDS: [(f64, &str); 7] = [
    (1000.0, "#800026"),
    (500.0, "#BD0026"),
    (200.0, "#E31A1C"),
    (100.0, "#FC4E2A"),
    (50.0, "#FD8D3C"),
    (20.0, "#FEB24C"),
    (10.0, "#FED976"),
];

/// Colour for everything at or below the lowest bound
pub const LOWEST_COLOR: &str = "#FFEDA0";

pub const NO_DATA_COLOR: &str = "#FFFFFF";
pub const BORDER_COLOR: &str = "#FFFFFF";

const FILL_OPACITY: f64 = 0.7;
const NO_DATA_OPACITY: f64 = 0.3;

/// Grid cell size (degrees) for region hit testing
const HIT_CELL_DEGREES: f64 = 2.0;

/// Fill colour for a metric value
pub fn classify(value: f64) -> &'static str {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| value > *bound)
        .map(|(_, color)| *color)
        .unwrap_or(LOWEST_COLOR)
}

/// Parse `#RRGGBB`
pub fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Visual style of one region
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureStyle {
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub color: &'static str,
    pub weight: u8,
    pub opacity: f64,
    /// Border dash length in pixels
    pub dash: Option<u32>,
}

impl FeatureStyle {
    pub fn for_value(value: Option<f64>) -> Self {
        match value {
            Some(v) => Self {
                fill_color: classify(v),
                fill_opacity: FILL_OPACITY,
                ..Self::no_data()
            },
            None => Self::no_data(),
        }
    }

    /// Style for regions without a metric value
    pub fn no_data() -> Self {
        Self {
            fill_color: NO_DATA_COLOR,
            fill_opacity: NO_DATA_OPACITY,
            color: BORDER_COLOR,
            weight: 2,
            opacity: 1.0,
            dash: Some(3),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.fill_color == NO_DATA_COLOR && self.fill_opacity == NO_DATA_OPACITY
    }
}

/// Information shown when a region is picked
#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub name: String,
    pub value: Option<f64>,
}

impl Popup {
    pub fn value_text(&self) -> String {
        match self.value {
            Some(v) => v.to_string(),
            None => "No Data".to_string(),
        }
    }
}

impl fmt::Display for Popup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\nValue: {}", self.name, self.value_text())
    }
}

/// One region with its resolved style and popup
#[derive(Clone, Debug)]
pub struct StyledFeature {
    /// Index into the layer's geometry
    pub region: usize,
    pub style: FeatureStyle,
    pub popup: Popup,
}

/// A fully styled choropleth for one metric. Built once, never mutated.
pub struct ChoroplethLayer {
    id: u64,
    metric: String,
    geometry: RegionGeometry,
    features: Vec<StyledFeature>,
    grid: FeatureGrid,
}

impl ChoroplethLayer {
    pub fn build(id: u64, metric: impl Into<String>, table: &MetricTable, geometry: RegionGeometry) -> Self {
        let features: Vec<StyledFeature> = geometry
            .regions()
            .iter()
            .enumerate()
            .map(|(region, r)| {
                let value = table.get(&r.name);
                StyledFeature {
                    region,
                    style: FeatureStyle::for_value(value),
                    popup: Popup {
                        name: r.name.clone(),
                        value,
                    },
                }
            })
            .collect();

        let grid = FeatureGrid::build(geometry.regions().iter().map(|r| r.bbox), HIT_CELL_DEGREES);

        let missing = features.iter().filter(|f| f.popup.value.is_none()).count();
        if missing > 0 {
            log::debug!("layer {}: {} of {} regions have no data", id, missing, features.len());
        }

        Self {
            id,
            metric: metric.into(),
            geometry,
            features,
            grid,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn geometry(&self) -> &RegionGeometry {
        &self.geometry
    }

    pub fn features(&self) -> &[StyledFeature] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&StyledFeature> {
        self.features.iter().find(|f| f.popup.name == name)
    }

    /// First region whose polygons contain the point
    pub fn feature_at(&self, lon: f64, lat: f64) -> Option<&StyledFeature> {
        self.grid
            .query_point(lon, lat)
            .iter()
            .find(|&&idx| self.geometry.get(idx).is_some_and(|r| r.contains(lon, lat)))
            .and_then(|&idx| self.features.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Polygon, Region};
    use glam::DVec2;

    fn square(name: &str, x: f64, y: f64, size: f64) -> Region {
        let ring = vec![
            DVec2::new(x, y),
            DVec2::new(x + size, y),
            DVec2::new(x + size, y + size),
            DVec2::new(x, y + size),
            DVec2::new(x, y),
        ];
        Region::new(name, vec![Polygon { exterior: ring, holes: Vec::new() }])
    }

    fn geometry() -> RegionGeometry {
        RegionGeometry::new(vec![
            square("Texas", 0.0, 0.0, 5.0),
            square("Ohio", 10.0, 0.0, 5.0),
            square("Maine", 20.0, 0.0, 5.0),
        ])
    }

    #[test]
    fn test_classify_ladder() {
        assert_eq!(classify(1500.0), "#800026");
        assert_eq!(classify(1000.01), "#800026");
        assert_eq!(classify(1000.0), "#BD0026");
        assert_eq!(classify(501.0), "#BD0026");
        assert_eq!(classify(300.0), "#E31A1C");
        assert_eq!(classify(150.0), "#FC4E2A");
        assert_eq!(classify(75.0), "#FD8D3C");
        assert_eq!(classify(21.0), "#FEB24C");
        assert_eq!(classify(20.0), "#FED976");
        assert_eq!(classify(10.0), "#FFEDA0");
        assert_eq!(classify(0.0), "#FFEDA0");
        assert_eq!(classify(-5.0), "#FFEDA0");
    }

    #[test]
    fn test_classify_is_monotonic() {
        // Position in the ladder; 0 is the most intense
        let rank = |v: f64| {
            let color = classify(v);
            THRESHOLDS
                .iter()
                .position(|(_, c)| *c == color)
                .unwrap_or(THRESHOLDS.len())
        };

        let mut prev = rank(5000.0);
        let mut v = 5000.0;
        while v > -100.0 {
            let r = rank(v);
            assert!(r >= prev, "intensity increased at {}", v);
            prev = r;
            v -= 0.5;
        }
    }

    #[test]
    fn test_no_data_style_is_distinct() {
        let no_data = FeatureStyle::for_value(None);
        assert!(no_data.is_no_data());
        for (_, color) in THRESHOLDS {
            assert_ne!(no_data.fill_color, color);
        }
        assert_ne!(no_data.fill_color, LOWEST_COLOR);
        assert!(!FeatureStyle::for_value(Some(0.0)).is_no_data());
        assert_eq!(FeatureStyle::for_value(Some(0.0)).fill_color, LOWEST_COLOR);
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#800026"), Some((0x80, 0x00, 0x26)));
        assert_eq!(hex_rgb("#FFEDA0"), Some((0xFF, 0xED, 0xA0)));
        assert_eq!(hex_rgb("800026"), None);
        assert_eq!(hex_rgb("#80002"), None);
        assert_eq!(hex_rgb("#GG0026"), None);
    }

    #[test]
    fn test_popup_text() {
        let with_value = Popup { name: "Texas".to_string(), value: Some(123.4) };
        assert_eq!(with_value.to_string(), "Texas\nValue: 123.4");

        let zero = Popup { name: "Ohio".to_string(), value: Some(0.0) };
        assert_eq!(zero.to_string(), "Ohio\nValue: 0");

        let missing = Popup { name: "Maine".to_string(), value: None };
        assert_eq!(missing.to_string(), "Maine\nValue: No Data");
    }

    #[test]
    fn test_layer_styles_each_region() {
        let table = MetricTable::parse("state,value\nTexas,1500\nOhio,15\n");
        let layer = ChoroplethLayer::build(1, "Sample Size", &table, geometry());

        assert_eq!(layer.features().len(), 3);
        assert_eq!(layer.feature("Texas").unwrap().style.fill_color, "#800026");
        assert_eq!(layer.feature("Ohio").unwrap().style.fill_color, "#FED976");

        let maine = layer.feature("Maine").unwrap();
        assert!(maine.style.is_no_data());
        assert_eq!(maine.popup.value, None);
    }

    #[test]
    fn test_feature_at() {
        let table = MetricTable::parse("state,value\nTexas,1500\n");
        let layer = ChoroplethLayer::build(1, "Sample Size", &table, geometry());

        assert_eq!(layer.feature_at(2.0, 2.0).map(|f| f.popup.name.as_str()), Some("Texas"));
        assert_eq!(layer.feature_at(12.0, 3.0).map(|f| f.popup.name.as_str()), Some("Ohio"));
        assert!(layer.feature_at(7.0, 2.0).is_none());
        assert!(layer.feature_at(2.0, 40.0).is_none());
    }
}
