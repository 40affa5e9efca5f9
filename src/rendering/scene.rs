//! Scene assembly and HTML output.

use crate::layout::{Layout, LayoutGraph, Point3};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::LazyLock;

const TEMPLATE: &str = include_str!("templates/scene.html");

/// Opening of the plot element in pages rendered by the `plotly` crate.
const PLOT_ELEMENT: &str = "<div id=\"plotly-html-element\"";

/// Inline plotly.js script elements, cut from an offline page rendered by the
/// `plotly` crate.
static PLOTLY_SCRIPTS: LazyLock<Option<String>> = LazyLock::new(|| {
    let page = plotly::Plot::new();
    library_scripts(&page.to_html()).map(str::to_string)
});

/// Default scene title.
pub const DEFAULT_TITLE: &str = "3D Knowledge Graph";

/// Vertex sequence for disjoint line segments.
///
/// Each segment is two vertices followed by a `None` break marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Polyline {
    /// X coordinates.
    pub x: Vec<Option<f64>>,
    /// Y coordinates.
    pub y: Vec<Option<f64>>,
    /// Z coordinates.
    pub z: Vec<Option<f64>>,
}

impl Polyline {
    /// Appends a segment and its break marker.
    pub fn push_segment(&mut self, from: Point3, to: Point3) {
        for point in [Some(from), Some(to), None] {
            self.x.push(point.map(|p| p.x));
            self.y.push(point.map(|p| p.y));
            self.z.push(point.map(|p| p.z));
        }
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.x.len() / 3
    }
}

/// Labelled points, one per node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointCloud {
    /// X coordinates.
    pub x: Vec<f64>,
    /// Y coordinates.
    pub y: Vec<f64>,
    /// Z coordinates.
    pub z: Vec<f64>,
    /// Text label of each point.
    pub labels: Vec<String>,
}

impl PointCloud {
    /// Appends a labelled point.
    pub fn push(&mut self, label: &str, point: Point3) {
        self.x.push(point.x);
        self.y.push(point.y);
        self.z.push(point.z);
        self.labels.push(label.to_string());
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A renderable 3D scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    /// All edges as one polyline.
    pub edges: Polyline,
    /// All nodes as one point cloud.
    pub nodes: PointCloud,
    /// Figure title.
    pub title: String,
    /// Figure width in pixels.
    pub width: u32,
    /// Figure height in pixels.
    pub height: u32,
}

/// Builds [`Scene`]s from a graph and its layout.
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            width: 1000,
            height: 800,
        }
    }
}

impl SceneBuilder {
    /// Creates a builder with the default title and size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles the scene.
    ///
    /// Nodes appear in layout order. Edges appear in graph enumeration order;
    /// an edge whose endpoint has no position is skipped.
    #[must_use]
    pub fn build(&self, graph: &LayoutGraph, layout: &Layout) -> Scene {
        let mut nodes = PointCloud::default();
        for (name, point) in layout.iter() {
            nodes.push(name, point);
        }

        let mut edges = Polyline::default();
        for (from, to, _) in graph.edges() {
            if let (Some(a), Some(b)) = (layout.point(from), layout.point(to)) {
                edges.push_segment(a, b);
            }
        }

        Scene {
            edges,
            nodes,
            title: self.title.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

impl Scene {
    /// Returns the scene as a Plotly figure.
    #[must_use]
    pub fn to_figure_json(&self) -> Value {
        json!({
            "data": [
                {
                    "type": "scatter3d",
                    "mode": "lines",
                    "x": self.edges.x,
                    "y": self.edges.y,
                    "z": self.edges.z,
                    "line": { "width": 1.5, "color": "gray" },
                },
                {
                    "type": "scatter3d",
                    "mode": "markers+text",
                    "x": self.nodes.x,
                    "y": self.nodes.y,
                    "z": self.nodes.z,
                    "marker": { "size": 6, "color": "blue", "opacity": 0.9 },
                    "text": self.nodes.labels,
                    "hoverinfo": "text",
                },
            ],
            "layout": {
                "title": { "text": self.title },
                "width": self.width,
                "height": self.height,
                "dragmode": "orbit",
            },
        })
    }

    /// Renders the scene as a standalone HTML page.
    ///
    /// plotly.js is inlined, so the page draws without network access. `</`
    /// in the embedded JSON is escaped so data can never close the
    /// surrounding `<script>` element.
    ///
    /// # Errors
    ///
    /// Returns an error if the figure cannot be serialized or the bundled
    /// plotly.js is unavailable.
    pub fn render_html(&self) -> Result<String> {
        let scripts = plotly_scripts()?;
        let json = serde_json::to_string(&self.to_figure_json())
            .map_err(|e| Error::OperationFailed {
                operation: "serialize_scene".to_string(),
                cause: e.to_string(),
            })?
            .replace("</", "<\\/");

        Ok(TEMPLATE
            .replacen("{{PLOTLY_JS}}", scripts, 1)
            .replace("{{TITLE}}", &escape_html(&self.title))
            .replace("{{FIGURE_JSON}}", &json))
    }

    /// Writes the rendered page to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or the write fails.
    pub fn write_html(&self, path: &Path) -> Result<()> {
        let html = self.render_html()?;
        std::fs::write(path, html).map_err(|e| Error::OperationFailed {
            operation: "write_scene_html".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        tracing::info!(path = %path.display(), "Wrote graph scene");
        Ok(())
    }
}

/// Returns the inline plotly.js script elements.
///
/// # Errors
///
/// Returns an error if the bundled page has no library scripts.
pub(crate) fn plotly_scripts() -> Result<&'static str> {
    PLOTLY_SCRIPTS
        .as_deref()
        .ok_or_else(|| Error::OperationFailed {
            operation: "embed_plotly".to_string(),
            cause: "no plotly.js scripts in the bundled page".to_string(),
        })
}

/// Returns the script elements that precede the plot element of a page.
fn library_scripts(page: &str) -> Option<&str> {
    let head = &page[..page.find(PLOT_ELEMENT)?];
    let start = head.find("<script")?;
    let end = head.rfind("</script>")? + "</script>".len();
    (start < end).then(|| &head[start..end])
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
