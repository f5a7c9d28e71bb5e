//! Plain-text rendering of posteriors.
//!
//! [`render`] picks a chart from the shape of the posterior: a bar chart
//! for discrete scalars, a histogram for continuous scalars, and one panel
//! per component for list-valued returns. Two continuous components also
//! get a joint density grid. A summary table closes every rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{PplError, Result};
use crate::posterior::Posterior;

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizOptions {
    /// Width of the longest bar, in characters.
    pub width: usize,
    /// Histogram bins for continuous values.
    pub bins: usize,
    /// Cells per side of the joint density grid.
    pub grid: usize,
}

impl Default for VizOptions {
    fn default() -> Self {
        Self {
            width: 40,
            bins: 20,
            grid: 16,
        }
    }
}

/// Weighted histogram with `bins` equal-width bins.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` edges.
    pub edges: Vec<f64>,
    /// Probability mass per bin.
    pub mass: Vec<f64>,
}

impl Histogram {
    pub fn new(points: &[(f64, f64)], bins: usize) -> Result<Self> {
        if points.is_empty() {
            return Err(PplError::EmptyPosterior);
        }
        if bins == 0 {
            return Err(PplError::Model("histogram needs at least one bin".to_string()));
        }

        let lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);

        if lo == hi {
            return Ok(Self {
                edges: vec![lo, hi],
                mass: vec![points.iter().map(|p| p.1).sum()],
            });
        }

        let bin_width = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + i as f64 * bin_width).collect();
        let mut mass = vec![0.0; bins];
        for &(x, w) in points {
            mass[bin_index(x, lo, bin_width, bins)] += w;
        }
        Ok(Self { edges, mass })
    }
}

fn bin_index(x: f64, lo: f64, bin_width: f64, bins: usize) -> usize {
    // the maximum lands in the last bin
    (((x - lo) / bin_width) as usize).min(bins - 1)
}

fn bar(value: f64, max: f64, width: usize) -> String {
    let ratio = if max > 0.0 { value / max } else { 0.0 };
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// One line per support value with its probability.
pub fn bar_chart(posterior: &Posterior, options: &VizOptions) -> String {
    let labels: Vec<String> = posterior.support().iter().map(|v| v.to_string()).collect();
    let label_width = labels.iter().map(String::len).max().unwrap_or(0);
    let max = posterior.probs().iter().cloned().fold(0.0, f64::max);

    let mut out = String::new();
    for (label, p) in labels.iter().zip(posterior.probs()) {
        let _ = writeln!(
            out,
            "{:>w$} │{} {:.4}",
            label,
            bar(*p, max, options.width),
            p,
            w = label_width
        );
    }
    out
}

/// Binned histogram of a scalar posterior.
pub fn histogram(posterior: &Posterior, options: &VizOptions) -> Result<String> {
    let points = posterior
        .iter()
        .map(|(v, p)| Ok((v.to_float()?, p)))
        .collect::<Result<Vec<_>>>()?;
    let hist = Histogram::new(&points, options.bins)?;
    let max = hist.mass.iter().cloned().fold(0.0, f64::max);

    let mut out = String::new();
    for (i, m) in hist.mass.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>10.3} │{} {:.4}",
            hist.edges[i],
            bar(*m, max, options.width),
            m
        );
    }
    Ok(out)
}

/// Joint density of components `i` and `j` of a list-valued posterior,
/// `i` along the horizontal axis.
pub fn density_grid(posterior: &Posterior, i: usize, j: usize, options: &VizOptions) -> Result<String> {
    let n = options.grid.max(1);
    let mut points = Vec::with_capacity(posterior.len());
    for (value, p) in posterior.iter() {
        let list = value
            .as_list()
            .ok_or_else(|| PplError::mismatch("list", value))?;
        let x = list
            .get(i)
            .ok_or_else(|| PplError::mismatch("list with enough components", value))?
            .to_float()?;
        let y = list
            .get(j)
            .ok_or_else(|| PplError::mismatch("list with enough components", value))?
            .to_float()?;
        points.push((x, y, p));
    }
    if points.is_empty() {
        return Err(PplError::EmptyPosterior);
    }

    let (x_lo, x_hi) = range(points.iter().map(|p| p.0));
    let (y_lo, y_hi) = range(points.iter().map(|p| p.1));
    let x_width = ((x_hi - x_lo) / n as f64).max(f64::MIN_POSITIVE);
    let y_width = ((y_hi - y_lo) / n as f64).max(f64::MIN_POSITIVE);

    let mut cells = vec![vec![0.0; n]; n];
    for &(x, y, p) in &points {
        let col = bin_index(x, x_lo, x_width, n);
        let row = bin_index(y, y_lo, y_width, n);
        cells[row][col] += p;
    }
    let max = cells.iter().flatten().cloned().fold(0.0, f64::max);

    let mut out = String::new();
    // highest y on top
    for (r, row) in cells.iter().enumerate().rev() {
        let _ = write!(out, "{:>10.3} │", y_lo + r as f64 * y_width);
        for &m in row {
            out.push(shade(m, max));
            out.push(shade(m, max));
        }
        out.push('\n');
    }
    let _ = writeln!(out, "{:>10} └{}", "", "─".repeat(2 * n));
    let _ = writeln!(out, "{:>10}  {:<.3}{:>w$.3}", "", x_lo, x_hi, w = (2 * n).saturating_sub(5));
    Ok(out)
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    })
}

fn shade(mass: f64, max: f64) -> char {
    if mass <= 0.0 || max <= 0.0 {
        return SHADES[0];
    }
    let level = ((mass / max) * (SHADES.len() - 1) as f64).ceil() as usize;
    SHADES[level.clamp(1, SHADES.len() - 1)]
}

/// Mean, standard deviation and central 95% interval per component.
pub fn summary_table(posterior: &Posterior, labels: &[&str]) -> Result<String> {
    let components: Vec<(String, Posterior)> = match posterior.dim() {
        Some(dim) => (0..dim)
            .map(|i| Ok((component_label(labels, i), posterior.marginal(i)?)))
            .collect::<Result<_>>()?,
        None => vec![(labels.first().unwrap_or(&"value").to_string(), posterior.clone())],
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "", "mean", "std", "2.5%", "97.5%"
    );
    for (label, marginal) in &components {
        let (lo, hi) = marginal.credible_interval(0.95)?;
        let _ = writeln!(
            out,
            "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            label,
            marginal.mean()?,
            marginal.std_dev()?,
            lo,
            hi
        );
    }
    Ok(out)
}

fn component_label(labels: &[&str], i: usize) -> String {
    labels
        .get(i)
        .map_or_else(|| format!("[{}]", i), |label| label.to_string())
}

fn panel(posterior: &Posterior, options: &VizOptions) -> Result<String> {
    if posterior.is_discrete() {
        Ok(bar_chart(posterior, options))
    } else {
        histogram(posterior, options)
    }
}

/// Choose a chart for the posterior and append its summary table.
pub fn render(posterior: &Posterior, labels: &[&str], options: &VizOptions) -> Result<String> {
    let mut out = String::new();
    match posterior.dim() {
        Some(dim) => {
            for i in 0..dim {
                let _ = writeln!(out, "{}", component_label(labels, i));
                out.push_str(&panel(&posterior.marginal(i)?, options)?);
                out.push('\n');
            }
            if dim == 2 && !posterior.is_discrete() {
                let _ = writeln!(
                    out,
                    "{} × {}",
                    component_label(labels, 0),
                    component_label(labels, 1)
                );
                out.push_str(&density_grid(posterior, 0, 1, options)?);
                out.push('\n');
            }
        }
        None => {
            out.push_str(&panel(posterior, options)?);
            out.push('\n');
        }
    }
    out.push_str(&summary_table(posterior, labels)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_histogram_bins() {
        let points = vec![(0.0, 0.25), (0.5, 0.25), (1.0, 0.5)];
        let hist = Histogram::new(&points, 2).unwrap();
        assert_eq!(hist.edges, vec![0.0, 0.5, 1.0]);
        assert_eq!(hist.mass, vec![0.25, 0.75]);

        let single = Histogram::new(&[(3.0, 1.0)], 10).unwrap();
        assert_eq!(single.mass, vec![1.0]);
        assert!(Histogram::new(&[], 3).is_err());
    }

    #[test]
    fn test_bar_chart_lines() {
        let post = Posterior::from_log_weighted(vec![
            (Value::Integer(1), 0.75f64.ln()),
            (Value::Integer(2), 0.25f64.ln()),
        ])
        .unwrap();
        let options = VizOptions {
            width: 4,
            ..VizOptions::default()
        };
        let chart = bar_chart(&post, &options);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "1 │████ 0.7500");
        assert_eq!(lines[1], "2 │█░░░ 0.2500");
    }

    #[test]
    fn test_render_list_posterior() {
        let post = Posterior::from_samples(vec![
            Value::from(vec![1.0, 2.0]),
            Value::from(vec![1.5, 2.5]),
            Value::from(vec![2.0, 3.0]),
        ])
        .unwrap();
        let text = render(&post, &["slope", "intercept"], &VizOptions::default()).unwrap();
        assert!(text.contains("slope × intercept"));
        assert!(text.contains("mean"));
        assert!(text.lines().any(|l| l.starts_with("intercept") && l.contains("2.5000")));
    }

    #[test]
    fn test_shade_levels() {
        assert_eq!(shade(0.0, 1.0), ' ');
        assert_eq!(shade(0.01, 1.0), '░');
        assert_eq!(shade(1.0, 1.0), '█');
    }
}
