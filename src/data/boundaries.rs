use crate::error::LoadError;
use crate::map::geometry::ring_contains;
use crate::source::Resource;
use geojson::{Feature, GeoJson, Geometry, Value};
use glam::DVec2;

/// A closed ring of (lon, lat) points
pub type Ring = Vec<DVec2>;

#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub exterior: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    fn from_rings(rings: &[Vec<Vec<f64>>]) -> Option<Self> {
        let mut rings = rings.iter().map(|ring| to_ring(ring));
        let exterior = rings.next()?;
        if exterior.len() < 3 {
            return None;
        }
        Some(Self {
            exterior,
            holes: rings.collect(),
        })
    }

    /// Even-odd containment; points inside a hole are outside
    pub fn contains(&self, p: DVec2) -> bool {
        ring_contains(&self.exterior, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    /// All rings, exterior first
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }
}

/// Bounding box in degrees: (min_lon, min_lat, max_lon, max_lat)
pub type BBox = (f64, f64, f64, f64);

/// A named administrative boundary (e.g. a state)
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub name: String,
    pub polygons: Vec<Polygon>,
    pub bbox: BBox,
}

impl Region {
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon>) -> Self {
        let bbox = bbox_of(polygons.iter().map(|p| &p.exterior));
        Self {
            name: name.into(),
            polygons,
            bbox,
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let (min_lon, min_lat, max_lon, max_lat) = self.bbox;
        if lon < min_lon || lon > max_lon || lat < min_lat || lat > max_lat {
            return false;
        }
        let p = DVec2::new(lon, lat);
        self.polygons.iter().any(|poly| poly.contains(p))
    }
}

/// Region boundary polygons, read-only once loaded
#[derive(Clone, Debug, Default)]
pub struct RegionGeometry {
    regions: Vec<Region>,
}

impl RegionGeometry {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Collect every named polygonal feature
    pub fn from_geojson(geojson: &GeoJson) -> Self {
        let mut regions = Vec::new();
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in &fc.features {
                    regions.extend(region_from_feature(feature));
                }
            }
            GeoJson::Feature(f) => regions.extend(region_from_feature(f)),
            GeoJson::Geometry(_) => {
                log::warn!("boundary file is a bare geometry without region names");
            }
        }
        Self { regions }
    }

    pub fn parse(text: &str, resource: &Resource) -> Result<Self, LoadError> {
        let geojson: GeoJson = text.parse().map_err(|e| LoadError::GeoJson {
            resource: resource.to_string(),
            source: Box::new(e),
        })?;
        Ok(Self::from_geojson(&geojson))
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn get(&self, idx: usize) -> Option<&Region> {
        self.regions.get(idx)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Extent of all regions, `None` when empty
    pub fn bounds(&self) -> Option<BBox> {
        if self.regions.is_empty() {
            return None;
        }
        Some(self.regions.iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |acc, r| {
                (
                    acc.0.min(r.bbox.0),
                    acc.1.min(r.bbox.1),
                    acc.2.max(r.bbox.2),
                    acc.3.max(r.bbox.3),
                )
            },
        ))
    }
}

fn region_from_feature(feature: &Feature) -> Option<Region> {
    let name = feature
        .properties
        .as_ref()
        .and_then(|p| p.get("name"))
        .and_then(|v| v.as_str());

    let Some(name) = name else {
        log::debug!("skipping boundary feature without a name");
        return None;
    };

    let mut polygons = Vec::new();
    if let Some(ref geometry) = feature.geometry {
        collect_polygons(geometry, &mut polygons);
    }

    if polygons.is_empty() {
        log::debug!("skipping boundary feature {:?}: no polygon geometry", name);
        return None;
    }

    Some(Region::new(name.trim(), polygons))
}

fn collect_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match &geometry.value {
        Value::Polygon(rings) => out.extend(Polygon::from_rings(rings)),
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                out.extend(Polygon::from_rings(rings));
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

fn to_ring(coords: &[Vec<f64>]) -> Ring {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| DVec2::new(c[0], c[1]))
        .collect()
}

fn bbox_of<'a>(rings: impl Iterator<Item = &'a Ring>) -> BBox {
    rings.flatten().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(min_x, min_y, max_x, max_y), p| (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y)),
    )
}

/// Fetch and parse the region boundary file
pub fn load_boundaries(resource: &Resource) -> Result<RegionGeometry, LoadError> {
    let text = resource.fetch_text()?;
    let geometry = RegionGeometry::parse(&text, resource)?;
    log::info!("{}: loaded {} regions", resource, geometry.len());
    Ok(geometry)
}
