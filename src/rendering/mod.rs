//! Scene rendering.
//!
//! Turns a laid-out graph into a [`Scene`] (one polyline for all edges and
//! one labelled point cloud for all nodes) and writes it as a static HTML page
//! with plotly.js inlined.

mod scene;

pub use scene::{PointCloud, Polyline, Scene, SceneBuilder};
