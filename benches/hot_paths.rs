use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::DVec2;
use tui_choropleth::data::{FrequencyTable, MetricTable, Polygon, Region, RegionGeometry};
use tui_choropleth::map::{classify, MapRenderer, Viewport};

/// A 10x5 grid of square "states" covering the continental US extent
fn grid_geometry() -> (RegionGeometry, String) {
    let mut regions = Vec::new();
    let mut csv = String::from("state,value\n");
    for row in 0..5 {
        for col in 0..10 {
            let x = -125.0 + col as f64 * 5.8;
            let y = 25.0 + row as f64 * 4.8;
            let ring = vec![
                DVec2::new(x, y),
                DVec2::new(x + 5.8, y),
                DVec2::new(x + 5.8, y + 4.8),
                DVec2::new(x, y + 4.8),
                DVec2::new(x, y),
            ];
            let name = format!("R{}-{}", row, col);
            csv.push_str(&format!("{},{}\n", name, (row * 10 + col) * 25));
            regions.push(Region::new(name, vec![Polygon { exterior: ring, holes: Vec::new() }]));
        }
    }
    (RegionGeometry::new(regions), csv)
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_sweep", |b| {
        b.iter(|| {
            let mut acc = 0usize;
            let mut v = -50.0;
            while v < 2000.0 {
                acc += classify(black_box(v)).len();
                v += 0.5;
            }
            acc
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    let (_, metric_csv) = grid_geometry();

    let mut freq = String::from("state");
    for bin in 0..20 {
        freq.push_str(&format!(",Age: {}-{}", bin * 5, bin * 5 + 5));
    }
    freq.push('\n');
    for region in 0..50 {
        freq.push_str(&format!("R{}", region));
        for bin in 0..20 {
            freq.push_str(&format!(",{}", region * bin));
        }
        freq.push('\n');
    }

    c.bench_function("metric_parse", |b| b.iter(|| MetricTable::parse(black_box(&metric_csv))));
    c.bench_function("frequency_series", |b| {
        b.iter(|| FrequencyTable::parse(black_box(&freq)).bin_series("R42", "Age"))
    });
}

fn bench_render(c: &mut Criterion) {
    let (geometry, csv) = grid_geometry();
    let table = MetricTable::parse(&csv);
    let mut map = MapRenderer::new();
    map.replace_layer("bench", &table, geometry);

    let viewport = Viewport::new(-96.0, 37.8, 5.0, 320, 200);
    c.bench_function("render_160x50", |b| b.iter(|| map.render(160, 50, black_box(&viewport))));
}

criterion_group!(benches, bench_classify, bench_parse, bench_render);
criterion_main!(benches);
