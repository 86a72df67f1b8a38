//! SVG export of render views.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use layer_holes::PathRole;

use crate::render::RenderView;

/// Parameters for SVG export.
#[derive(Debug, Clone)]
pub struct SvgExportParams {
    /// Width of the SVG in pixels.
    pub width: u32,
    /// Height of the SVG in pixels.
    pub height: u32,
    /// Padding around the content in pixels.
    pub padding: u32,
    /// Stroke width for contours.
    pub stroke_width: f64,
    /// Fill color for exteriors (CSS color string).
    pub fill_color: String,
    /// Stroke color for closed contours.
    pub stroke_color: String,
    /// Background color; holes are filled with it.
    pub background_color: String,
    /// Stroke color for open paths.
    pub open_color: String,
    /// Stroke color for ambiguous paths.
    pub ambiguous_color: String,
    /// Whether to draw holes.
    pub show_holes: bool,
    /// Whether to draw open paths.
    pub show_open: bool,
}

impl Default for SvgExportParams {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            padding: 20,
            stroke_width: 1.0,
            fill_color: "#4a90d9".to_string(),
            stroke_color: "#2d5986".to_string(),
            background_color: "#f5f5f5".to_string(),
            open_color: "#d98c2d".to_string(),
            ambiguous_color: "#d92d2d".to_string(),
            show_holes: true,
            show_open: true,
        }
    }
}

impl SvgExportParams {
    /// Set the exterior fill and stroke colors.
    #[must_use]
    pub fn with_colors(mut self, fill: &str, stroke: &str) -> Self {
        self.fill_color = fill.to_string();
        self.stroke_color = stroke.to_string();
        self
    }

    /// Set the canvas size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Render one view to SVG.
///
/// Exteriors are drawn first, then holes (filled with the background),
/// then open and ambiguous paths as strokes.
#[must_use]
pub fn export_view_svg(view: &RenderView, params: &SvgExportParams) -> String {
    let Some(bounds) = view.bounds() else {
        return format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"0 0 {} {}\">\n\
  <rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n\
  <text x=\"50%\" y=\"50%\" text-anchor=\"middle\" fill=\"#999\">No shapes at Z={:.3}mm</text>\n\
</svg>",
            params.width,
            params.height,
            params.width,
            params.height,
            params.background_color,
            view.z.mm()
        );
    };

    let content_width = bounds.width();
    let content_height = bounds.height();

    let padding = f64::from(params.padding);
    let available_width = 2.0f64.mul_add(-padding, f64::from(params.width));
    let available_height = 2.0f64.mul_add(-padding, f64::from(params.height));

    let scale = if content_width > 0.0 && content_height > 0.0 {
        (available_width / content_width).min(available_height / content_height)
    } else {
        1.0
    };

    let offset_x = padding + content_width.mul_add(-scale, available_width) / 2.0;
    let offset_y = padding + content_height.mul_add(-scale, available_height) / 2.0;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
  <rect width="100%" height="100%" fill="{}"/>
  <g transform="translate({:.2},{:.2}) scale({:.6},{:.6})">
"#,
        params.width,
        params.height,
        params.width,
        params.height,
        params.background_color,
        bounds.min_x.mul_add(-scale, offset_x),
        bounds.max_y.mul_add(scale, offset_y), // SVG Y is inverted
        scale,
        -scale
    );

    let mut ordered: Vec<_> = view.paths.iter().collect();
    ordered.sort_by_key(|p| p.role);

    let stroke_width = params.stroke_width / scale;
    for path in ordered {
        if path.points.is_empty()
            || (path.role == PathRole::Hole && !params.show_holes)
            || (path.role == PathRole::Open && !params.show_open)
        {
            continue;
        }

        let mut d = String::new();
        for (i, point) in path.points.iter().enumerate() {
            let op = if i == 0 { "M" } else { " L" };
            let _ = write!(d, "{op} {:.4} {:.4}", point.x, point.y);
        }
        if path.closed {
            d.push_str(" Z");
        }

        let (fill, stroke, dash) = match path.role {
            PathRole::Exterior => (params.fill_color.as_str(), params.stroke_color.as_str(), ""),
            PathRole::Hole => (
                params.background_color.as_str(),
                params.stroke_color.as_str(),
                "",
            ),
            PathRole::Open => ("none", params.open_color.as_str(), ""),
            PathRole::Ambiguous => (
                "none",
                params.ambiguous_color.as_str(),
                " stroke-dasharray=\"2,2\"",
            ),
        };

        let _ = writeln!(
            svg,
            r#"    <path class="{}" d="{}" fill="{}" stroke="{}" stroke-width="{:.4}"{}/>"#,
            path.role, d, fill, stroke, stroke_width, dash
        );
    }

    svg.push_str("  </g>\n");

    let _ = write!(
        svg,
        "  <text x=\"10\" y=\"20\" font-family=\"monospace\" font-size=\"12\" fill=\"#666\">\n\
    {}: Z={:.3}mm, exteriors={}, holes={}\n\
  </text>\n",
        view.title,
        view.z.mm(),
        view.count(PathRole::Exterior),
        view.count(PathRole::Hole)
    );

    svg.push_str("</svg>");

    svg
}

/// File name for a view: title and height, filesystem-safe.
#[must_use]
pub fn svg_file_name(view: &RenderView) -> String {
    let stem: String = view
        .title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{stem}_z{:.3}.svg", view.z.mm())
}

/// Write every view into `dir`.
///
/// # Errors
///
/// Returns the first I/O error.
pub fn save_views_svg(
    views: &[RenderView],
    dir: &Path,
    params: &SvgExportParams,
) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    views
        .iter()
        .map(|view| {
            let path = dir.join(svg_file_name(view));
            fs::write(&path, export_view_svg(view, params))?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderPath;
    use layer_types::{Height, Point2};

    fn path(role: PathRole, points: &[(f64, f64)], closed: bool) -> RenderPath {
        RenderPath {
            role,
            file_name: "part.clf".to_string(),
            identifier: None,
            points: points.iter().map(|&(x, y)| Point2::new(x, y)).collect(),
            closed,
        }
    }

    fn view() -> RenderView {
        RenderView {
            title: "part.clf".to_string(),
            z: Height::from_mm(1.5),
            paths: vec![
                path(
                    PathRole::Hole,
                    &[(4.0, 4.0), (4.0, 6.0), (6.0, 6.0), (6.0, 4.0)],
                    true,
                ),
                path(
                    PathRole::Exterior,
                    &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
                    true,
                ),
                path(PathRole::Open, &[(12.0, 0.0), (14.0, 2.0)], false),
            ],
        }
    }

    #[test]
    fn test_export_view() {
        let svg = export_view_svg(&view(), &SvgExportParams::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 3);
        assert!(svg.contains("exteriors=1, holes=1"));

        // Exterior is drawn before the hole listed ahead of it.
        let exterior = svg.find("class=\"exterior\"").unwrap();
        let hole = svg.find("class=\"hole\"").unwrap();
        assert!(exterior < hole);
        assert!(svg.contains("fill=\"#f5f5f5\" stroke"));
    }

    #[test]
    fn test_hide_holes_and_open() {
        let mut params = SvgExportParams::default().with_size(400, 300);
        params.show_holes = false;
        params.show_open = false;
        let svg = export_view_svg(&view(), &params);
        assert_eq!(svg.matches("<path").count(), 1);
        assert!(svg.contains("width=\"400\""));
    }

    #[test]
    fn test_empty_view() {
        let empty = RenderView {
            title: "x".to_string(),
            z: Height::from_mm(2.0),
            paths: Vec::new(),
        };
        let svg = export_view_svg(&empty, &SvgExportParams::default());
        assert!(svg.contains("No shapes"));
    }

    #[test]
    fn test_save_views() {
        let dir = tempfile::tempdir().unwrap();
        let written = save_views_svg(&[view()], dir.path(), &SvgExportParams::default()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("part_clf_z1.500.svg"));
        assert!(std::fs::read_to_string(&written[0]).unwrap().contains("<svg"));
    }
}
