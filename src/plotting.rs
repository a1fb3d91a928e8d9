//! Point plots of group means with 95% confidence intervals
//!
//! Requires the `plotting` feature. Styling is carried entirely by the
//! `PlotConfig` passed to each call.

use plotters::prelude::*;
use std::path::Path;

use crate::compare::{compare, CompareOptions, Comparison, GroupSummary};
use crate::data::Dataset;
use crate::error::{AnovaError, Result};

/// Plot configuration options.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    /// Width of the plot in pixels.
    pub width: u32,
    /// Height of the plot in pixels.
    pub height: u32,
    pub title: Option<String>,
    /// X-axis label, the grouping field when `None`.
    pub x_label: Option<String>,
    /// Y-axis label, the plotted field when `None`.
    pub y_label: Option<String>,
    pub font_size: u32,
    pub palette: ColorPalette,
    /// Horizontal spread between hue series at the same x (0 disables).
    pub dodge: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 500,
            title: None,
            x_label: None,
            y_label: None,
            font_size: 16,
            palette: ColorPalette::Default,
            dodge: 0.2,
        }
    }
}

/// Color palettes for plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPalette {
    /// Single blue series, for one-factor point plots.
    Default,
    /// Soft qualitative palette for several series.
    Set2,
    /// Colorblind-friendly palette.
    ColorBlind,
}

impl ColorPalette {
    /// Get `n` colors, cycling through the palette.
    pub fn colors(&self, n: usize) -> Vec<RGBColor> {
        let base: &[RGBColor] = match self {
            ColorPalette::Default => &[
                RGBColor(31, 119, 180),
                RGBColor(255, 127, 14),
                RGBColor(44, 160, 44),
                RGBColor(214, 39, 40),
            ],
            ColorPalette::Set2 => &[
                RGBColor(102, 194, 165),
                RGBColor(252, 141, 98),
                RGBColor(141, 160, 203),
                RGBColor(231, 138, 195),
                RGBColor(166, 216, 84),
                RGBColor(255, 217, 47),
                RGBColor(229, 196, 148),
                RGBColor(179, 179, 179),
            ],
            ColorPalette::ColorBlind => &[
                RGBColor(0, 114, 178),
                RGBColor(230, 159, 0),
                RGBColor(0, 158, 115),
                RGBColor(204, 121, 167),
                RGBColor(86, 180, 233),
                RGBColor(213, 94, 0),
                RGBColor(240, 228, 66),
            ],
        };
        (0..n).map(|i| base[i % base.len()]).collect()
    }
}

/// Mean ± 95% CI of `target_field` for each level of `group_field`
pub fn plot_point_estimates<P: AsRef<Path>>(
    dataset: &Dataset,
    group_field: &str,
    target_field: &str,
    path: P,
    config: &PlotConfig,
) -> Result<()> {
    let options = CompareOptions {
        normalize: false,
        ..Default::default()
    };
    let summary = compare(dataset, group_field, target_field, None, &options)?;
    draw_point_plot(&summary, path.as_ref(), config)
}

/// One line per hue level across the x levels of a comparison
pub fn plot_comparison<P: AsRef<Path>>(
    comparison: &Comparison,
    path: P,
    config: &PlotConfig,
) -> Result<()> {
    draw_point_plot(comparison, path.as_ref(), config)
}

fn draw_point_plot(comparison: &Comparison, path: &Path, config: &PlotConfig) -> Result<()> {
    if comparison.groups.is_empty() {
        return Err(AnovaError::EmptyData {
            reason: "no groups to plot".to_string(),
        });
    }

    let n_x = comparison.x_levels.len();
    let hue_keys: Vec<Option<&str>> = if comparison.hue_levels.is_empty() {
        vec![None]
    } else {
        comparison.hue_levels.iter().map(|h| Some(h.as_str())).collect()
    };
    let n_series = hue_keys.len();

    // Intervals are NaN for single-observation groups; fall back to the mean
    let lows = comparison.groups.iter().map(|g| finite_or(g.ci_lower, g.mean));
    let highs = comparison.groups.iter().map(|g| finite_or(g.ci_upper, g.mean));
    let y_min = lows.fold(f64::INFINITY, f64::min);
    let y_max = highs.fold(f64::NEG_INFINITY, f64::max);
    let y_margin = ((y_max - y_min) * 0.1).max(1e-9);

    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| AnovaError::PlottingError(e.to_string()))?;

    let y_label = config.y_label.clone().unwrap_or_else(|| {
        if comparison.normalized {
            format!("{} (%)", comparison.y_field)
        } else {
            comparison.y_field.clone()
        }
    });
    let x_label = config
        .x_label
        .clone()
        .unwrap_or_else(|| comparison.x_field.clone());

    let mut builder = ChartBuilder::on(&root);
    builder.margin(10).x_label_area_size(40).y_label_area_size(70);
    if let Some(title) = &config.title {
        builder.caption(title, ("sans-serif", config.font_size).into_font());
    }
    let mut chart = builder
        .build_cartesian_2d(
            -0.5..(n_x as f64 - 0.5),
            (y_min - y_margin)..(y_max + y_margin),
        )
        .map_err(|e| AnovaError::PlottingError(e.to_string()))?;

    let levels = &comparison.x_levels;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n_x.max(2))
        .x_label_formatter(&|x| {
            let idx = x.round();
            if (x - idx).abs() < 1e-6 && idx >= 0.0 {
                levels.get(idx as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .x_desc(x_label)
        .y_desc(y_label)
        .label_style(("sans-serif", config.font_size))
        .draw()
        .map_err(|e| AnovaError::PlottingError(e.to_string()))?;

    let colors = config.palette.colors(n_series);
    let cap = 0.05;

    for (s, hue) in hue_keys.iter().enumerate() {
        let color = colors[s];
        let offset = if n_series > 1 {
            config.dodge * (s as f64 / (n_series - 1) as f64 - 0.5)
        } else {
            0.0
        };

        let points: Vec<(f64, &GroupSummary)> = comparison
            .series(*hue)
            .into_iter()
            .filter_map(|g| {
                levels
                    .iter()
                    .position(|l| *l == g.x)
                    .map(|i| (i as f64 + offset, g))
            })
            .collect();

        chart
            .draw_series(
                points
                    .iter()
                    .filter(|(_, g)| g.ci_lower.is_finite() && g.ci_upper.is_finite())
                    .flat_map(|&(x, g)| {
                        vec![
                            PathElement::new(vec![(x, g.ci_lower), (x, g.ci_upper)], color),
                            PathElement::new(vec![(x - cap, g.ci_lower), (x + cap, g.ci_lower)], color),
                            PathElement::new(vec![(x - cap, g.ci_upper), (x + cap, g.ci_upper)], color),
                        ]
                    }),
            )
            .map_err(|e| AnovaError::PlottingError(e.to_string()))?;

        let series = chart
            .draw_series(LineSeries::new(
                points.iter().map(|&(x, g)| (x, g.mean)),
                color.stroke_width(2),
            ))
            .map_err(|e| AnovaError::PlottingError(e.to_string()))?;
        if let Some(label) = hue {
            series
                .label(label.to_string())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, g)| Circle::new((x, g.mean), 4, color.filled())),
            )
            .map_err(|e| AnovaError::PlottingError(e.to_string()))?;
    }

    if n_series > 1 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(|e| AnovaError::PlottingError(e.to_string()))?;
    }

    root.present()
        .map_err(|e| AnovaError::PlottingError(e.to_string()))?;
    log::info!("Plot saved to: {}", path.display());

    Ok(())
}

fn finite_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        let colors = ColorPalette::Set2.colors(10);
        assert_eq!(colors.len(), 10);
        assert_eq!(colors[0], colors[8]);
    }

    #[test]
    fn test_default_config() {
        let config = PlotConfig::default();
        assert_eq!(config.palette, ColorPalette::Default);
        assert!(config.title.is_none());
    }
}
