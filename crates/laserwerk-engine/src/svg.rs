// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Markup stage: SVG text to flat, colored outlines.
//
// usvg does the heavy lifting — shape-to-path conversion, transform
// resolution, and text outlining against the job's font store. This module
// walks the resulting tree and flattens every drawable into absolute
// polylines in millimetres, keyed by color so process filters can select
// them later.

use tracing::debug;
use usvg::tiny_skia_path::{PathSegment, Point};

use laserwerk_core::error::{LaserwerkError, Result};
use laserwerk_core::settings::color_key;

use crate::fonts::FontStore;

/// usvg user units are CSS pixels at 96 dpi.
const MM_PER_PX: f64 = 25.4 / 96.0;

/// One flattened subpath with its filter key.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Color key for process filters (stroke color, else fill color).
    pub color: String,
    /// Whether the source path carried a fill (raster processes hatch these).
    pub filled: bool,
    /// Whether the subpath was explicitly closed.
    pub closed: bool,
    /// Polyline vertices in millimetres, transforms already applied.
    pub points: Vec<(f64, f64)>,
}

/// Parsed and flattened markup.
#[derive(Debug, Clone)]
pub struct Document {
    pub width_mm: f64,
    pub height_mm: f64,
    pub outlines: Vec<Outline>,
}

/// Parse markup text into a [`Document`].
///
/// `curve_tolerance_mm` bounds the chord deviation when curves are
/// subdivided into polylines.
pub fn parse(markup: &str, fonts: &FontStore, curve_tolerance_mm: f32) -> Result<Document> {
    let mut options = usvg::Options::default();
    *options.fontdb_mut() = fonts.build_database();

    let tree = usvg::Tree::from_str(markup, &options)
        .map_err(|e| LaserwerkError::Markup(e.to_string()))?;

    // Outline points come out in millimetres, so the tolerance stays in
    // millimetres too.
    let tolerance_mm = f64::from(curve_tolerance_mm).max(1e-4);
    let mut outlines = Vec::new();
    collect_group(tree.root(), tolerance_mm, &mut outlines);

    let document = Document {
        width_mm: f64::from(tree.size().width()) * MM_PER_PX,
        height_mm: f64::from(tree.size().height()) * MM_PER_PX,
        outlines,
    };
    debug!(
        outlines = document.outlines.len(),
        width_mm = document.width_mm,
        height_mm = document.height_mm,
        "markup flattened"
    );
    Ok(document)
}

fn collect_group(group: &usvg::Group, tolerance_mm: f64, out: &mut Vec<Outline>) {
    for node in group.children() {
        match node {
            usvg::Node::Group(g) => collect_group(g, tolerance_mm, out),
            usvg::Node::Path(p) => collect_path(p, tolerance_mm, out),
            // Text has already been outlined against the job fonts.
            usvg::Node::Text(t) => collect_group(t.flattened(), tolerance_mm, out),
            // Embedded raster images have no vector outline to follow.
            usvg::Node::Image(_) => {}
        }
    }
}

fn collect_path(path: &usvg::Path, tolerance_mm: f64, out: &mut Vec<Outline>) {
    let stroke_key = path.stroke().and_then(|s| paint_key(s.paint()));
    let fill_key = path.fill().and_then(|f| paint_key(f.paint()));
    let Some(color) = stroke_key.or_else(|| fill_key.clone()) else {
        return; // nothing visible to mark
    };
    let filled = fill_key.is_some();

    let transform = path.abs_transform();
    let mut current: Vec<(f64, f64)> = Vec::new();
    let mut closed = false;
    let mut flush = |points: &mut Vec<(f64, f64)>, closed: bool, out: &mut Vec<Outline>| {
        if points.len() >= 2 {
            out.push(Outline {
                color: color.clone(),
                filled,
                closed,
                points: std::mem::take(points),
            });
        } else {
            points.clear();
        }
    };

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                flush(&mut current, closed, out);
                closed = false;
                current.push(map_point(transform, p));
            }
            PathSegment::LineTo(p) => current.push(map_point(transform, p)),
            PathSegment::QuadTo(c, p) => {
                let Some(&start) = current.last() else { continue };
                let c = map_point(transform, c);
                let end = map_point(transform, p);
                flatten_quad(start, c, end, tolerance_mm, &mut current);
            }
            PathSegment::CubicTo(c1, c2, p) => {
                let Some(&start) = current.last() else { continue };
                let c1 = map_point(transform, c1);
                let c2 = map_point(transform, c2);
                let end = map_point(transform, p);
                flatten_cubic(start, c1, c2, end, tolerance_mm, &mut current);
            }
            PathSegment::Close => {
                if let Some(&first) = current.first() {
                    current.push(first);
                }
                closed = true;
            }
        }
    }
    flush(&mut current, closed, out);
}

fn paint_key(paint: &usvg::Paint) -> Option<String> {
    match paint {
        usvg::Paint::Color(c) => Some(color_key(c.red, c.green, c.blue)),
        // Gradients and patterns carry no single filter color.
        _ => None,
    }
}

fn map_point(transform: usvg::tiny_skia_path::Transform, p: Point) -> (f64, f64) {
    let mut mapped = [p];
    transform.map_points(&mut mapped);
    (
        f64::from(mapped[0].x) * MM_PER_PX,
        f64::from(mapped[0].y) * MM_PER_PX,
    )
}

/// Subdivision count for a curve whose control polygon has length `len`.
fn segment_count(len: f64, tolerance: f64) -> usize {
    ((len / tolerance.max(1e-6)).sqrt().ceil() as usize).clamp(4, 64)
}

fn flatten_quad(
    p0: (f64, f64),
    c: (f64, f64),
    p1: (f64, f64),
    tolerance: f64,
    out: &mut Vec<(f64, f64)>,
) {
    let len = dist(p0, c) + dist(c, p1);
    let n = segment_count(len, tolerance);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        let u = 1.0 - t;
        let x = u * u * p0.0 + 2.0 * u * t * c.0 + t * t * p1.0;
        let y = u * u * p0.1 + 2.0 * u * t * c.1 + t * t * p1.1;
        out.push((x, y));
    }
}

fn flatten_cubic(
    p0: (f64, f64),
    c1: (f64, f64),
    c2: (f64, f64),
    p1: (f64, f64),
    tolerance: f64,
    out: &mut Vec<(f64, f64)>,
) {
    let len = dist(p0, c1) + dist(c1, c2) + dist(c2, p1);
    let n = segment_count(len, tolerance);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        let u = 1.0 - t;
        let x = u * u * u * p0.0
            + 3.0 * u * u * t * c1.0
            + 3.0 * u * t * t * c2.0
            + t * t * t * p1.0;
        let y = u * u * u * p0.1
            + 3.0 * u * u * t * c1.1
            + 3.0 * u * t * t * c2.1
            + t * t * t * p1.1;
        out.push((x, y));
    }
}

fn dist(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="20mm" height="10mm" viewBox="0 0 20 10">
        <rect x="2" y="2" width="16" height="6" fill="none" stroke="black" stroke-width="0.5"/>
    </svg>"#;

    #[test]
    fn rect_becomes_one_closed_outline() {
        let doc = parse(RECT_SVG, &FontStore::new(), 0.1).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        let outline = &doc.outlines[0];
        assert_eq!(outline.color, "black");
        assert!(outline.closed);
        assert!(!outline.filled);
        assert!(outline.points.len() >= 5);
        // viewBox units equal mm here, so the outline spans 16mm horizontally.
        let xs: Vec<f64> = outline.points.iter().map(|p| p.0).collect();
        let span = xs.iter().cloned().fold(f64::MIN, f64::max)
            - xs.iter().cloned().fold(f64::MAX, f64::min);
        assert!((span - 16.0).abs() < 0.1, "span was {span}");
    }

    #[test]
    fn document_size_is_in_millimetres() {
        let doc = parse(RECT_SVG, &FontStore::new(), 0.1).unwrap();
        assert!((doc.width_mm - 20.0).abs() < 0.1, "width {}", doc.width_mm);
        assert!((doc.height_mm - 10.0).abs() < 0.1, "height {}", doc.height_mm);
    }

    #[test]
    fn curves_are_flattened() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <path d="M 0 5 C 2 0, 8 0, 10 5" fill="none" stroke="red"/>
        </svg>"#;
        let doc = parse(svg, &FontStore::new(), 0.05).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        assert_eq!(doc.outlines[0].color, "red");
        assert!(!doc.outlines[0].closed);
        assert!(doc.outlines[0].points.len() > 4, "curve not subdivided");
    }

    #[test]
    fn filled_shapes_keep_their_fill_flag() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <circle cx="5" cy="5" r="4" fill="blue"/>
        </svg>"#;
        let doc = parse(svg, &FontStore::new(), 0.1).unwrap();
        assert_eq!(doc.outlines.len(), 1);
        assert!(doc.outlines[0].filled);
        assert_eq!(doc.outlines[0].color, "blue");
    }

    #[test]
    fn unpainted_elements_are_skipped() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <rect x="1" y="1" width="8" height="8" fill="none" stroke="none"/>
        </svg>"#;
        let doc = parse(svg, &FontStore::new(), 0.1).unwrap();
        assert!(doc.outlines.is_empty());
    }

    #[test]
    fn invalid_markup_is_a_markup_error() {
        let err = parse("<svg", &FontStore::new(), 0.1).unwrap_err();
        assert!(matches!(err, LaserwerkError::Markup(_)));
    }

    #[test]
    fn multiple_subpaths_split_into_outlines() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">
            <path d="M 0 0 L 2 0 M 5 5 L 7 5 L 7 7" fill="none" stroke="black"/>
        </svg>"#;
        let doc = parse(svg, &FontStore::new(), 0.1).unwrap();
        assert_eq!(doc.outlines.len(), 2);
        assert_eq!(doc.outlines[0].points.len(), 2);
        assert_eq!(doc.outlines[1].points.len(), 3);
    }
}
