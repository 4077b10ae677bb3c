//! Chart rendering

use crate::Result;
use anyhow::{ensure, Context};
use plotters::{
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};
use std::{fs, path::Path};

/// Colors of successive bar series
const SERIES_COLORS: [RGBColor; 4] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
];

/// Bar chart with one group of bars per category and one bar per series
/// within each group
#[derive(Clone, Debug, PartialEq)]
pub struct GroupedBarChart<'a> {
    /// Legend of the horizontal axis
    pub x_label: &'a str,

    /// Legend of the vertical axis
    pub y_label: &'a str,

    /// Category of each bar group
    pub categories: Vec<&'a str>,

    /// Name of each series, with one value per category
    pub series: Vec<(&'a str, Vec<f64>)>,
}

/// Something that can save a chart to a file
pub trait ChartRenderer {
    /// Render `chart` to `path`, creating parent directories as needed
    fn render(&self, chart: &GroupedBarChart<'_>, path: &Path) -> Result<()>;
}

/// SVG chart renderer
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SvgRenderer {
    /// Image size in pixels
    pub size: (u32, u32),
}
//
impl Default for SvgRenderer {
    fn default() -> Self {
        Self { size: (800, 600) }
    }
}
//
impl ChartRenderer for SvgRenderer {
    fn render(&self, chart: &GroupedBarChart<'_>, path: &Path) -> Result<()> {
        let num_categories = chart.categories.len();
        let num_series = chart.series.len();
        ensure!(
            num_categories > 0 && num_series > 0,
            "cannot plot an empty chart"
        );
        ensure!(
            chart.series.iter().all(|(_, values)| values.len() == num_categories),
            "every series needs one value per category"
        );
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating chart directory {}", parent.display()))?;
        }

        let y_max = chart
            .series
            .iter()
            .flat_map(|(_, values)| values.iter().copied())
            .fold(0.0, f64::max)
            * 1.1;
        let y_max = if y_max > 0.0 { y_max } else { 1.0 };

        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let mut plot = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..num_categories as f64, 0.0..y_max)?;
        plot.configure_mesh()
            .disable_x_mesh()
            .x_labels(num_categories + 1)
            .x_label_formatter(&|_| String::new())
            .x_desc(chart.x_label)
            .y_desc(chart.y_label)
            .draw()?;

        // Within each category's unit-wide slot, bars sit side by side with
        // some padding on both ends
        let bar_width = 0.8 / num_series as f64;
        for (index, (name, values)) in chart.series.iter().enumerate() {
            let color = SERIES_COLORS[index % SERIES_COLORS.len()];
            let offset = 0.1 + index as f64 * bar_width;
            plot.draw_series(values.iter().enumerate().map(|(category, &value)| {
                let x0 = category as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, value)], color.filled())
            }))?
            .label(*name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
        plot.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        // Category names go under the middle of each group
        let label_style =
            TextStyle::from(("sans-serif", 15).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
        for (category, name) in chart.categories.iter().enumerate() {
            let (x, y) = plot.backend_coord(&(category as f64 + 0.5, 0.0));
            root.draw(&Text::new(name.to_string(), (x, y + 8), label_style.clone()))?;
        }

        root.present()
            .with_context(|| format!("saving chart to {}", path.display()))?;
        Ok(())
    }
}
