pub mod choropleth;
pub mod geometry;
mod projection;
mod renderer;
mod spatial;

pub use choropleth::{classify, ChoroplethLayer, FeatureStyle, Popup};
pub use projection::Viewport;
pub use renderer::{blend, MapLayers, MapRenderer, BASEMAP_RGB};
