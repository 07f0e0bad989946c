//! Stroke state machine - turns live input geometry into a coverage mask
//!
//! A [`Stroke`] records the geometry of one gesture (`begin`, any number of
//! `draw`/`polyline` calls, `end`) and keeps the [`Map`] in sync with it.
//! Shape tools redraw a live preview on every `draw`; `end` rasterizes the
//! final geometry with the brush tip. The same geometry can be rasterized
//! again at 4x4 supersampling to produce antialiasing coverage.

mod map;

pub use map::{oval_outline, Map, Tip, MAP_SET};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bitmap::Rect;
use crate::brush::Brush;

/// Supersampling factor per axis for [`Stroke::coverage`]
pub const COVERAGE_SCALE: i32 = 4;
/// Canvas rows re-rasterized per coverage band
const COVERAGE_BAND: i32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeKind {
    /// Brush tip dragged along the pointer path
    #[default]
    Freehand,
    /// Freehand lasso, filled on end
    Region,
    Line,
    /// Click-to-add vertices, filled on end
    Polygon,
    Rect,
    RectFill,
    Oval,
    OvalFill,
}

/// Per-pixel 0-255 coverage over a canvas rectangle
#[derive(Debug, Clone)]
pub struct Coverage {
    rect: Rect,
    data: Vec<u8>,
}

impl Coverage {
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Coverage at canvas `(x, y)`; 0 outside the rectangle
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if !self.rect.contains(x, y) {
            return 0;
        }
        let i = (y - self.rect.y) as usize * self.rect.w as usize + (x - self.rect.x) as usize;
        self.data[i]
    }
}

#[derive(Debug, Clone)]
pub struct Stroke {
    kind: StrokeKind,
    active: bool,
    /// Freehand path, lasso points or polygon vertices
    points: Vec<(i32, i32)>,
    start: (i32, i32),
    cursor: (i32, i32),
    /// Dirty box of the finished geometry
    bounds: Rect,
    canvas: Rect,
}

impl Stroke {
    pub fn new(kind: StrokeKind) -> Self {
        Self {
            kind,
            active: false,
            points: Vec::new(),
            start: (0, 0),
            cursor: (0, 0),
            bounds: Rect::default(),
            canvas: Rect::default(),
        }
    }

    pub fn kind(&self) -> StrokeKind {
        self.kind
    }

    /// Switch tools; ignored while a stroke is in progress
    pub fn set_kind(&mut self, kind: StrokeKind) {
        if !self.active {
            self.kind = kind;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    /// Clipped dirty box of the last rasterized geometry, brush radius included
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn begin(&mut self, map: &mut Map, brush: &Brush, x: i32, y: i32) {
        self.active = true;
        self.canvas = map.full_rect();
        self.points.clear();
        self.points.push((x, y));
        self.start = (x, y);
        self.cursor = (x, y);

        map.clear();
        match self.kind {
            StrokeKind::Freehand => {
                map.stamp(&Tip::from_brush(brush, 1), x, y);
            }
            StrokeKind::Region | StrokeKind::Polygon => map.set(x, y, MAP_SET),
            _ => self.rasterize(map, brush, 1, 0, 0),
        }
        self.update_bounds(brush);
    }

    /// Pointer moved while the stroke is active
    pub fn draw(&mut self, map: &mut Map, brush: &Brush, x: i32, y: i32) {
        if !self.active {
            return;
        }
        let (lx, ly) = self.cursor;
        self.cursor = (x, y);

        match self.kind {
            StrokeKind::Freehand => {
                if (lx, ly) != (x, y) {
                    map.stamp_line(&Tip::from_brush(brush, 1), lx, ly, x, y);
                    self.points.push((x, y));
                }
            }
            StrokeKind::Region => {
                if (lx, ly) != (x, y) {
                    map.line(lx, ly, x, y, MAP_SET);
                    self.points.push((x, y));
                }
            }
            StrokeKind::Polygon => {
                // Rubber band from the last vertex to the cursor
                map.clear();
                self.preview_polyline(map);
                if let Some(&(vx, vy)) = self.points.last() {
                    map.line(vx, vy, x, y, MAP_SET);
                }
            }
            _ => {
                map.clear();
                self.rasterize(map, brush, 1, 0, 0);
            }
        }
        self.update_bounds(brush);
    }

    /// Add a polygon vertex
    pub fn polyline(&mut self, map: &mut Map, x: i32, y: i32) {
        if !self.active || self.kind != StrokeKind::Polygon {
            return;
        }
        if self.points.last() != Some(&(x, y)) {
            self.points.push((x, y));
        }
        self.cursor = (x, y);
        map.clear();
        self.preview_polyline(map);
    }

    fn preview_polyline(&self, map: &mut Map) {
        for pair in self.points.windows(2) {
            map.line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, MAP_SET);
        }
        if let [(x, y)] = self.points[..] {
            map.set(x, y, MAP_SET);
        }
    }

    /// Finish the stroke: the map holds the final coverage and the dirty box is returned
    pub fn end(&mut self, map: &mut Map, brush: &Brush) -> Rect {
        if !self.active {
            return Rect::default();
        }

        map.clear();
        self.rasterize(map, brush, 1, 0, 0);
        self.active = false;
        self.update_bounds(brush);

        debug!(
            "[Stroke] {:?} finished: {} points, bounds {:?}",
            self.kind,
            self.points.len(),
            self.bounds
        );
        self.bounds
    }

    /// Box around the raw geometry, before brush inflation
    fn extent(&self) -> Rect {
        match self.kind {
            StrokeKind::Freehand | StrokeKind::Region | StrokeKind::Polygon => {
                let cursor = Rect::new(self.cursor.0, self.cursor.1, 1, 1);
                self.points
                    .iter()
                    .map(|&(x, y)| Rect::new(x, y, 1, 1))
                    .fold(cursor, |acc, r| acc.union(&r))
            }
            _ => Rect::from_corners(self.start.0, self.start.1, self.cursor.0, self.cursor.1),
        }
    }

    fn update_bounds(&mut self, brush: &Brush) {
        self.bounds = self
            .extent()
            .inflate(brush.radius() + 1)
            .intersect(&self.canvas);
    }

    /// Draw the geometry into `map` at `scale` with canvas origin `(ox, oy)`.
    ///
    /// Canvas pixel `p` maps to `(p - o) * scale + scale / 2`, the center of
    /// its block in the scaled map.
    fn rasterize(&self, map: &mut Map, brush: &Brush, scale: i32, ox: i32, oy: i32) {
        let s = scale;
        let to = |(x, y): (i32, i32)| ((x - ox) * s + s / 2, (y - oy) * s + s / 2);
        let block = |(x, y): (i32, i32)| ((x - ox) * s, (y - oy) * s);
        let (x1, y1) = to(self.start);
        let (x2, y2) = to(self.cursor);

        match self.kind {
            StrokeKind::Freehand => {
                let tip = Tip::from_brush(brush, s);
                let mut last = None;
                for &p in &self.points {
                    let (x, y) = to(p);
                    match last {
                        None => map.stamp(&tip, x, y),
                        Some((lx, ly)) => map.stamp_line(&tip, lx, ly, x, y),
                    }
                    last = Some((x, y));
                }
            }
            StrokeKind::Line => {
                map.stamp_line(&Tip::from_brush(brush, s), x1, y1, x2, y2);
            }
            StrokeKind::Region | StrokeKind::Polygon => {
                let mut vertices: Vec<(i32, i32)> = self.points.iter().map(|&p| to(p)).collect();
                if self.kind == StrokeKind::Polygon && self.points.last() != Some(&self.cursor) {
                    vertices.push(to(self.cursor));
                }
                map.polyfill(&vertices, MAP_SET);

                let edge = Tip::square(s);
                for (i, &(ax, ay)) in vertices.iter().enumerate() {
                    let (bx, by) = vertices[(i + 1) % vertices.len()];
                    map.stamp_line(&edge, ax, ay, bx, by);
                }
            }
            StrokeKind::Rect => {
                let tip = Tip::from_brush(brush, s);
                map.stamp_line(&tip, x1, y1, x2, y1);
                map.stamp_line(&tip, x2, y1, x2, y2);
                map.stamp_line(&tip, x2, y2, x1, y2);
                map.stamp_line(&tip, x1, y2, x1, y1);
            }
            StrokeKind::RectFill | StrokeKind::OvalFill | StrokeKind::Oval => {
                let (left, top) = block((self.start.0.min(self.cursor.0), self.start.1.min(self.cursor.1)));
                let (right, bottom) =
                    block((self.start.0.max(self.cursor.0), self.start.1.max(self.cursor.1)));
                let (right, bottom) = (right + s - 1, bottom + s - 1);

                match self.kind {
                    StrokeKind::RectFill => map.rectfill(left, top, right, bottom, MAP_SET),
                    StrokeKind::OvalFill => map.ovalfill(left, top, right, bottom, MAP_SET),
                    _ => {
                        let tip = Tip::from_brush(brush, s);
                        for (x, y) in oval_outline(left, top, right, bottom) {
                            map.stamp(&tip, x, y);
                        }
                    }
                }
            }
        }
    }

    /// Supersampled coverage over [`Stroke::bounds`].
    ///
    /// The geometry is re-rasterized at [`COVERAGE_SCALE`] in bands of
    /// canvas rows and box-reduced, so memory stays proportional to one band.
    pub fn coverage(&self, brush: &Brush) -> Coverage {
        let rect = self.bounds;
        let mut data = vec![0u8; rect.area()];
        if rect.is_empty() {
            return Coverage { rect, data };
        }

        let s = COVERAGE_SCALE;
        let samples = (s * s) as u32;
        let mut band_y = 0;

        while band_y < rect.h {
            let band_h = COVERAGE_BAND.min(rect.h - band_y);
            let mut sub = Map::new(rect.w * s, band_h * s);
            self.rasterize(&mut sub, brush, s, rect.x, rect.y + band_y);

            for y in 0..band_h {
                for x in 0..rect.w {
                    let mut count = 0u32;
                    for sy in 0..s {
                        for sx in 0..s {
                            if sub.get(x * s + sx, y * s + sy) != 0 {
                                count += 1;
                            }
                        }
                    }
                    let i = (band_y + y) as usize * rect.w as usize + x as usize;
                    data[i] = (count * 255 / samples) as u8;
                }
            }
            band_y += band_h;
        }

        Coverage { rect, data }
    }
}
