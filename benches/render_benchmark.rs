//! Render, KD-tree and palette benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use raster_core::kdtree::{KdPoint, KdTree};
use raster_core::palette::Palette;
use raster_core::render;
use raster_core::{
    Bitmap, BlendMode, Brush, BrushShape, CancelToken, Cooperative, Map, PaintContext, PaintMode,
    Stroke, StrokeKind,
};

const CANVAS: i32 = 512;

/// Canvas with a finished disc stroke covering most of it
fn disc_setup(brush: &Brush) -> (Bitmap, Map, Stroke) {
    let mut bmp = Bitmap::new(CANVAS, CANVAS);
    bmp.clear(0xff80_8080);
    let mut map = Map::for_bitmap(&bmp);
    let mut stroke = Stroke::new(StrokeKind::OvalFill);
    stroke.begin(&mut map, brush, 32, 32);
    stroke.draw(&mut map, brush, CANVAS - 33, CANVAS - 33);
    stroke.end(&mut map, brush);
    (bmp, map, stroke)
}

fn benchmark_render_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("Render Modes");
    group.sample_size(10);

    let modes = [
        PaintMode::Solid,
        PaintMode::Antialiased,
        PaintMode::Coarse,
        PaintMode::Fine,
        PaintMode::Blurry,
        PaintMode::Watercolor,
        PaintMode::Chalk,
        PaintMode::Texture,
        PaintMode::Average,
    ];

    for mode in modes {
        let brush = Brush {
            size: 1,
            shape: BrushShape::Round,
            edge: 8,
            mode,
            color: 0xff20_40c0,
            ..Brush::default()
        };
        let ctx = PaintContext::new(BlendMode::Trans);
        let token = CancelToken::new();

        group.bench_with_input(BenchmarkId::new("disc", format!("{:?}", mode)), &brush, |b, brush| {
            b.iter(|| {
                let (mut bmp, mut map, stroke) = disc_setup(brush);
                let mut coop = Cooperative::new(&token, 64);
                let mut rng = StdRng::seed_from_u64(1);
                render::begin(&mut bmp, &mut map, &stroke, brush, &ctx, &mut coop, &mut rng)
            })
        });
    }

    group.finish();
}

fn benchmark_kdtree(c: &mut Criterion) {
    let mut group = c.benchmark_group("KD-tree");
    let mut rng = StdRng::seed_from_u64(7);

    for count in [256usize, 4096, 65536] {
        let points: Vec<KdPoint> = (0..count)
            .map(|i| {
                KdPoint::new3(
                    rng.gen_range(0..256),
                    rng.gen_range(0..256),
                    rng.gen_range(0..256),
                    i as u32,
                )
            })
            .collect();
        let queries: Vec<[i32; 3]> = (0..1000)
            .map(|_| [rng.gen_range(0..256), rng.gen_range(0..256), rng.gen_range(0..256)])
            .collect();

        group.bench_with_input(BenchmarkId::new("build", count), &points, |b, points| {
            b.iter(|| KdTree::build(points.clone(), 3))
        });

        let tree = KdTree::build(points, 3);
        group.bench_with_input(BenchmarkId::new("1000 queries", count), &queries, |b, queries| {
            b.iter(|| queries.iter().filter_map(|&q| tree.nearest(q)).count())
        });
    }

    group.finish();
}

fn benchmark_palette_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("Palette");
    group.sample_size(10);

    let palette = Palette::default_palette();
    group.bench_function("build_table", |b| b.iter(|| palette.build_table()));

    group.finish();
}

criterion_group!(
    benches,
    benchmark_render_modes,
    benchmark_kdtree,
    benchmark_palette_table
);
criterion_main!(benches);
