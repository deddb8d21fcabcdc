//! Visualization utilities for highway_path_planning
//!
//! Draws the road, the surrounding traffic and the planned path with gnuplot.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{EgoState, NeighborVehicle, Path2D, LANE_COUNT};
use crate::mapping::RoadMap;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const BLUE: &str = "#0000FF";
    pub const GRAY: &str = "#808080";

    pub const ROAD_EDGE: &str = BLACK;
    pub const LANE_MARKING: &str = GRAY;
    pub const EGO: &str = BLUE;
    pub const NEIGHBOR: &str = "#DD3355";
    pub const PATH: &str = RED;
    pub const TRACE: &str = "#35C788";
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::new(colors::PATH, "Planned path")
    }
}

/// Main visualizer struct
pub struct Visualizer {
    figure: Figure,
    title: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    /// Spacing of the samples used to draw lane lines [m]
    road_resolution: f64,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            figure: Figure::new(),
            title: String::new(),
            x_range: None,
            y_range: None,
            road_resolution: 2.0,
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    /// Restrict the view to a window around `(x, y)`
    pub fn focus_on(&mut self, x: f64, y: f64, half_width: f64) -> &mut Self {
        self.x_range = Some((x - half_width, x + half_width));
        self.y_range = Some((y - half_width, y + half_width));
        self
    }

    /// Draw road edges and lane markings
    pub fn plot_road(&mut self, map: &RoadMap, lane_width: f64) -> &mut Self {
        let samples = (map.max_s() / self.road_resolution).ceil() as usize;
        for boundary in 0..=LANE_COUNT {
            let d = boundary as f64 * lane_width;
            let (x, y): (Vec<f64>, Vec<f64>) = (0..=samples)
                .map(|i| {
                    let p = map.to_cartesian(i as f64 * self.road_resolution, d);
                    (p.x, p.y)
                })
                .unzip();
            let edge = boundary == 0 || boundary == LANE_COUNT;
            let (color, width) = if edge {
                (colors::ROAD_EDGE, 1.5)
            } else {
                (colors::LANE_MARKING, 0.5)
            };
            self.figure
                .axes2d()
                .lines(&x, &y, &[Color(color), LineWidth(width)]);
        }
        self
    }

    pub fn plot_path(&mut self, path: &Path2D, style: &PathStyle) -> &mut Self {
        self.figure.axes2d().lines(
            &path.x_coords(),
            &path.y_coords(),
            &[
                Caption(&style.caption),
                Color(&style.color),
                LineWidth(style.line_width),
            ],
        );
        self
    }

    pub fn plot_neighbors(&mut self, neighbors: &[NeighborVehicle]) -> &mut Self {
        let x: Vec<f64> = neighbors.iter().map(|n| n.x).collect();
        let y: Vec<f64> = neighbors.iter().map(|n| n.y).collect();
        self.figure.axes2d().points(
            &x,
            &y,
            &[
                Caption("Traffic"),
                Color(colors::NEIGHBOR),
                PointSymbol('S'),
                PointSize(1.0),
            ],
        );
        self
    }

    /// Ego position with a short heading marker
    pub fn plot_ego(&mut self, ego: &EgoState) -> &mut Self {
        let marker = 4.0;
        self.figure
            .axes2d()
            .points(
                &[ego.x],
                &[ego.y],
                &[
                    Caption("Ego"),
                    Color(colors::EGO),
                    PointSymbol('O'),
                    PointSize(1.5),
                ],
            )
            .lines(
                &[ego.x, ego.x + marker * ego.heading.cos()],
                &[ego.y, ego.y + marker * ego.heading.sin()],
                &[Color(colors::EGO), LineWidth(2.0)],
            );
        self
    }

    pub fn save_png(&mut self, path: &str, width: u32, height: u32) -> Result<(), String> {
        self.apply_settings();
        self.figure
            .save_to_png(path, width, height)
            .map_err(|e| e.to_string())
    }

    fn apply_settings(&mut self) {
        let axes = self.figure.axes2d();

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);

        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        axes.set_aspect_ratio(AutoOption::Fix(1.0));
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}
