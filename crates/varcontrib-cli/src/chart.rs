//! Horizontal bar charts for the terminal.
//!
//! One row per asset. Every chart of a comparison is drawn against the same
//! [`AxisRange`] so bar lengths can be compared across estimators; values
//! outside the range are cut at the edge and marked.

use varcontrib_risk::comparison::AxisRange;

const BAR: char = '█';
const ZERO: char = '┊';
const CLIPPED_LOW: &str = " ◀";
const CLIPPED_HIGH: &str = " ▶";

/// A titled bar chart over a fixed value range.
#[derive(Debug, Clone)]
pub struct BarChart<'a> {
    title: String,
    values: &'a [f64],
    range: AxisRange,
    width: usize,
}

impl<'a> BarChart<'a> {
    /// Default number of bar columns.
    pub const DEFAULT_WIDTH: usize = 48;

    /// Creates a chart of `values` drawn against `range`.
    pub fn new(title: impl Into<String>, values: &'a [f64], range: AxisRange) -> Self {
        Self {
            title: title.into(),
            values,
            range,
            width: Self::DEFAULT_WIDTH,
        }
    }

    /// Sets the number of bar columns.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(2);
        self
    }

    /// Column of `value` on the axis, `0..=width`.
    fn column(&self, value: f64) -> usize {
        let span = self.range.span();
        let fraction = if span > 0.0 {
            (value - self.range.min) / span
        } else {
            0.5
        };
        let col = (fraction * self.width as f64).round();
        col.clamp(0.0, self.width as f64) as usize
    }

    fn bar(&self, value: f64) -> (String, &'static str) {
        let (clipped, was_clipped) = self.range.clip(value);
        let zero = self.column(0.0);
        let end = self.column(clipped);
        let (lo, hi) = if end < zero { (end, zero) } else { (zero, end) };

        let bar: String = (0..self.width)
            .map(|i| {
                if (lo..hi).contains(&i) {
                    BAR
                } else if i == zero {
                    ZERO
                } else {
                    ' '
                }
            })
            .collect();

        let marker = match (was_clipped, value < self.range.min) {
            (false, _) => "",
            (true, true) => CLIPPED_LOW,
            (true, false) => CLIPPED_HIGH,
        };
        (bar, marker)
    }

    /// Renders the chart as plain text, title on the first line.
    pub fn render(&self) -> String {
        let labels: Vec<String> = (1..=self.values.len()).map(|i| format!("#{i}")).collect();
        let label_width = labels.iter().map(String::len).max().unwrap_or(0);

        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');

        for (label, value) in labels.iter().zip(self.values) {
            let (bar, marker) = self.bar(*value);
            out.push_str(&format!(
                "{label:>label_width$} │{bar}│ {value:>+11.6}{marker}\n"
            ));
        }

        let min = format!("{:.4}", self.range.min);
        let max = format!("{:.4}", self.range.max);
        let gap = (self.width + 2).saturating_sub(min.len() + max.len());
        out.push_str(&format!(
            "{:label_width$} {min}{:gap$}{max}\n",
            "", ""
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_range() -> AxisRange {
        AxisRange { min: -1.0, max: 1.0 }
    }

    #[test]
    fn test_negative_bar_extends_left_of_zero() {
        let chart = BarChart::new("t", &[], unit_range()).with_width(10);
        let (bar, marker) = chart.bar(-1.0);
        assert_eq!(bar, "█████┊    ");
        assert_eq!(marker, "");
    }

    #[test]
    fn test_positive_bar_extends_right_of_zero() {
        let chart = BarChart::new("t", &[], unit_range()).with_width(10);
        let (bar, _) = chart.bar(0.5);
        assert_eq!(bar, "     ███  ");
    }

    #[test]
    fn test_out_of_range_values_are_clipped_and_marked() {
        let chart = BarChart::new("t", &[], unit_range()).with_width(10);
        let (bar, marker) = chart.bar(3.0);
        assert_eq!(bar, "     █████");
        assert_eq!(marker, CLIPPED_HIGH);

        let (_, marker) = chart.bar(-3.0);
        assert_eq!(marker, CLIPPED_LOW);
    }

    #[test]
    fn test_render_has_one_row_per_value() {
        let values = [-0.5, -0.25, 0.1];
        let text = BarChart::new("Contributions", &values, unit_range()).render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Contributions");
        assert!(lines[1].starts_with("#1 │"));
        assert!(lines[3].contains("+0.100000"));
    }
}
