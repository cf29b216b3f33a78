//! Outline import and conversion
//!
//! Imports SVG outlines into `kurbo::BezPath` geometry, places them in
//! font coordinates (y-flip, uniform scale to the configured glyph
//! height, top of the viewbox at the ascent line), and converts the
//! result to UFO contours. Stroked source paths are expanded to
//! outlines, since a font glyph only has fills.

use anyhow::{anyhow, Context, Result};
use kurbo::{Affine, BezPath, PathEl, Point};
use std::path::Path;
use usvg::{NodeExt, TreeParsing};

use crate::core::settings::BuildSettings;

/// Curve flattening tolerance for stroke expansion, in SVG units.
const IMPORT_TOLERANCE: f64 = 0.25;

/// Coordinate comparison tolerance when closing contours.
const POINT_EPSILON: f64 = 1e-6;

/// Read and parse an SVG file into a single outline in SVG coordinates.
pub fn import_file(path: &Path) -> Result<BezPath> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read outline file {}", path.display()))?;
    parse_svg(&data).with_context(|| format!("failed to parse outline file {}", path.display()))
}

/// Parse SVG data into one combined outline in SVG coordinates.
///
/// Filled paths contribute their geometry directly; stroked paths are
/// expanded to their stroke outline first. Overlap between the resulting
/// contours is left for the font compiler to deal with.
pub fn parse_svg(data: &[u8]) -> Result<BezPath> {
    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|error| anyhow!("invalid SVG: {error}"))?;

    let mut outline = BezPath::new();
    for node in tree.root.descendants() {
        if let usvg::NodeKind::Path(ref path) = *node.borrow() {
            let transform = to_affine(node.abs_transform());
            let geometry = skia_path_to_bez(&path.data);
            if path.fill.is_some() {
                append(&mut outline, transform * geometry.clone());
            }
            if let Some(stroke) = &path.stroke {
                append(&mut outline, transform * expand_stroke(&geometry, stroke));
            }
        }
    }
    Ok(outline)
}

/// The affine placing an imported SVG outline into font coordinates.
///
/// SVG y grows downward from the viewbox top; font y grows upward from
/// the baseline. The viewbox top lands at the ascent line and the scale
/// maps the full viewbox height onto the configured glyph height.
pub fn placement_transform(settings: &BuildSettings) -> Affine {
    let scale = settings.scale_factor();
    Affine::new([scale, 0.0, 0.0, -scale, 0.0, settings.ascent()])
}

/// A hollow rectangle in SVG coordinates, used when the configured
/// placeholder file cannot be read.
pub fn builtin_placeholder() -> BezPath {
    let mut path = BezPath::new();
    // Outer boundary, clockwise in SVG space
    path.move_to(Point::new(14.0, 14.0));
    path.line_to(Point::new(58.0, 14.0));
    path.line_to(Point::new(58.0, 58.0));
    path.line_to(Point::new(14.0, 58.0));
    path.close_path();
    // Counter, reversed so the middle stays unfilled
    path.move_to(Point::new(20.0, 20.0));
    path.line_to(Point::new(20.0, 52.0));
    path.line_to(Point::new(52.0, 52.0));
    path.line_to(Point::new(52.0, 20.0));
    path.close_path();
    path
}

fn append(outline: &mut BezPath, piece: BezPath) {
    for element in piece.elements() {
        outline.push(*element);
    }
}

fn to_affine(transform: usvg::Transform) -> Affine {
    Affine::new([
        transform.sx as f64,
        transform.ky as f64,
        transform.kx as f64,
        transform.sy as f64,
        transform.tx as f64,
        transform.ty as f64,
    ])
}

fn skia_path_to_bez(path: &usvg::tiny_skia_path::Path) -> BezPath {
    use usvg::tiny_skia_path::PathSegment;

    let mut bez = BezPath::new();
    for segment in path.segments() {
        match segment {
            PathSegment::MoveTo(p) => bez.move_to(to_point(p)),
            PathSegment::LineTo(p) => bez.line_to(to_point(p)),
            PathSegment::QuadTo(p1, p2) => bez.quad_to(to_point(p1), to_point(p2)),
            PathSegment::CubicTo(p1, p2, p3) => {
                bez.curve_to(to_point(p1), to_point(p2), to_point(p3))
            }
            PathSegment::Close => bez.close_path(),
        }
    }
    bez
}

fn to_point(p: usvg::tiny_skia_path::Point) -> Point {
    Point::new(p.x as f64, p.y as f64)
}

fn expand_stroke(geometry: &BezPath, stroke: &usvg::Stroke) -> BezPath {
    let style = kurbo::Stroke::new(stroke.width.get() as f64)
        .with_caps(match stroke.linecap {
            usvg::LineCap::Butt => kurbo::Cap::Butt,
            usvg::LineCap::Round => kurbo::Cap::Round,
            usvg::LineCap::Square => kurbo::Cap::Square,
        })
        .with_join(match stroke.linejoin {
            usvg::LineJoin::Round => kurbo::Join::Round,
            usvg::LineJoin::Bevel => kurbo::Join::Bevel,
            _ => kurbo::Join::Miter,
        })
        .with_miter_limit(stroke.miterlimit.get() as f64);
    kurbo::stroke(
        geometry.elements().iter().copied(),
        &style,
        &kurbo::StrokeOpts::default(),
        IMPORT_TOLERANCE,
    )
}

/// Convert a placed outline to UFO contours.
///
/// Each `MoveTo` starts a contour. A contour whose path is closed drops
/// the leading move point: in UFO a closed contour wraps around, and the
/// first point carries the type of the closing segment.
pub fn bezpath_to_contours(path: &BezPath) -> Vec<norad::Contour> {
    let mut contours = Vec::new();
    let mut builder = ContourBuilder::default();

    for element in path.elements() {
        match *element {
            PathEl::MoveTo(p) => {
                builder.flush(&mut contours);
                builder.start(p);
            }
            PathEl::LineTo(p) => {
                builder.push(p, norad::PointType::Line, &[]);
            }
            PathEl::QuadTo(p1, p2) => {
                builder.push(p2, norad::PointType::QCurve, &[p1]);
            }
            PathEl::CurveTo(p1, p2, p3) => {
                builder.push(p3, norad::PointType::Curve, &[p1, p2]);
            }
            PathEl::ClosePath => {
                builder.close(&mut contours);
            }
        }
    }
    builder.flush(&mut contours);
    contours
}

#[derive(Default)]
struct ContourBuilder {
    start: Option<Point>,
    points: Vec<norad::ContourPoint>,
    current: Point,
}

impl ContourBuilder {
    fn start(&mut self, p: Point) {
        self.start = Some(p);
        self.current = p;
        self.points.clear();
    }

    fn push(&mut self, on_curve: Point, typ: norad::PointType, off_curves: &[Point]) {
        if self.start.is_none() {
            return;
        }
        for off in off_curves {
            self.points.push(contour_point(*off, norad::PointType::OffCurve));
        }
        self.points.push(contour_point(on_curve, typ));
        self.current = on_curve;
    }

    /// Finish a closed contour. When the final segment already ends at
    /// the start point, that trailing on-curve point is folded into the
    /// first position so the wrap-around segment keeps its curve type;
    /// otherwise the implicit closing segment is a line.
    fn close(&mut self, contours: &mut Vec<norad::Contour>) {
        let Some(start) = self.start.take() else {
            return;
        };
        let mut first_type = norad::PointType::Line;
        if near(self.current, start) {
            if let Some(last) = self.points.pop() {
                first_type = last.typ;
            }
        }
        let mut points = vec![contour_point(start, first_type)];
        points.append(&mut self.points);
        // Off-curves left trailing by the fold belong to the wrap
        // segment; rotating them to the front keeps every off-curve run
        // directly before its on-curve point.
        contours.push(norad::Contour::new(rotate_offcurves(points), None));
        self.points.clear();
    }

    /// Finish an open contour (no ClosePath seen).
    fn flush(&mut self, contours: &mut Vec<norad::Contour>) {
        let Some(start) = self.start.take() else {
            return;
        };
        if self.points.is_empty() {
            // A lone move contributes no geometry
            self.points.clear();
            return;
        }
        let mut points = vec![contour_point(start, norad::PointType::Move)];
        points.append(&mut self.points);
        contours.push(norad::Contour::new(points, None));
    }
}

/// Move any off-curve points that precede nothing (i.e. trail at the end
/// of a closed contour after the fold) in front of the start point, so
/// every off-curve run is followed by its on-curve point.
fn rotate_offcurves(mut points: Vec<norad::ContourPoint>) -> Vec<norad::ContourPoint> {
    let trailing = points
        .iter()
        .rev()
        .take_while(|p| p.typ == norad::PointType::OffCurve)
        .count();
    if trailing > 0 && trailing < points.len() {
        let tail = points.split_off(points.len() - trailing);
        let mut rotated = tail;
        rotated.append(&mut points);
        return rotated;
    }
    points
}

fn contour_point(p: Point, typ: norad::PointType) -> norad::ContourPoint {
    norad::ContourPoint::new(p.x, p.y, typ, false, None, None)
}

fn near(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < POINT_EPSILON && (a.y - b.y).abs() < POINT_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    #[test]
    fn test_placement_transform_maps_viewbox_onto_em() {
        let settings = BuildSettings::default();
        let place = placement_transform(&settings);
        // Viewbox top lands on the ascent line
        assert_eq!(place * Point::new(0.0, 0.0), Point::new(0.0, 1040.0));
        // Viewbox bottom lands on the descender
        let bottom = place * Point::new(0.0, 72.0);
        assert!((bottom.y - (-260.0)).abs() < 1e-9, "got {}", bottom.y);
        // x scales uniformly
        let right = place * Point::new(72.0, 0.0);
        assert!((right.x - 1300.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_filled_rect() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 72 72">
            <path fill="#000" d="M10 10 L62 10 L62 62 L10 62 Z"/>
        </svg>"##;
        let outline = parse_svg(svg).unwrap();
        assert!(!outline.elements().is_empty());
        let bbox = outline.bounding_box();
        assert!((bbox.min_x() - 10.0).abs() < 1e-3);
        assert!((bbox.max_y() - 62.0).abs() < 1e-3);
    }

    #[test]
    fn test_parse_stroked_line_is_expanded() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 72 72">
            <path fill="none" stroke="#000" stroke-width="4" d="M10 36 L62 36"/>
        </svg>"##;
        let outline = parse_svg(svg).unwrap();
        let bbox = outline.bounding_box();
        // A zero-area centerline becomes a band two units either side
        assert!(bbox.height() >= 3.9, "stroke expanded, got {}", bbox.height());
    }

    #[test]
    fn test_parse_group_transform_applies() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 72 72">
            <g transform="translate(10 0)">
                <path fill="#000" d="M0 0 L10 0 L10 10 L0 10 Z"/>
            </g>
        </svg>"##;
        let outline = parse_svg(svg).unwrap();
        let bbox = outline.bounding_box();
        assert!((bbox.min_x() - 10.0).abs() < 1e-3, "translate applied");
    }

    #[test]
    fn test_parse_rejects_invalid_svg() {
        assert!(parse_svg(b"this is not an svg").is_err());
    }

    #[test]
    fn test_builtin_placeholder_has_counter() {
        let path = builtin_placeholder();
        let contours = bezpath_to_contours(&path);
        assert_eq!(contours.len(), 2, "outer boundary and counter");
    }

    #[test]
    fn test_closed_contour_drops_move_point() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));
        path.line_to(Point::new(10.0, 10.0));
        path.close_path();

        let contours = bezpath_to_contours(&path);
        assert_eq!(contours.len(), 1);
        let points = &contours[0].points;
        assert_eq!(points.len(), 3);
        // All points are on-curve lines; the wrap segment closes the triangle
        assert!(points.iter().all(|p| p.typ == norad::PointType::Line));
        assert_eq!((points[0].x, points[0].y), (0.0, 0.0));
    }

    #[test]
    fn test_closed_curve_contour_folds_duplicate_endpoint() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));
        path.curve_to(
            Point::new(12.0, 4.0),
            Point::new(2.0, 4.0),
            Point::new(0.0, 0.0),
        );
        path.close_path();

        let contours = bezpath_to_contours(&path);
        assert_eq!(contours.len(), 1);
        let points = &contours[0].points;
        // start (now Curve), its two leading off-curves, and the line point
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].typ, norad::PointType::OffCurve);
        assert_eq!(points[1].typ, norad::PointType::OffCurve);
        assert_eq!(points[2].typ, norad::PointType::Curve);
        assert_eq!((points[2].x, points[2].y), (0.0, 0.0));
        assert_eq!(points[3].typ, norad::PointType::Line);
    }

    #[test]
    fn test_open_contour_keeps_move_point() {
        let mut path = BezPath::new();
        path.move_to(Point::new(0.0, 0.0));
        path.line_to(Point::new(10.0, 0.0));

        let contours = bezpath_to_contours(&path);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points[0].typ, norad::PointType::Move);
    }
}
