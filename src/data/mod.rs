mod boundaries;
mod frequency;
mod metric;

pub use boundaries::{load_boundaries, BBox, Polygon, Region, RegionGeometry, Ring};
pub use frequency::{load_frequency, Bin, BinSeries, FrequencyTable};
pub use metric::{load_metric, MetricTable};
