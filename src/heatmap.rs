//! Heatmap rendering model shared by the window and the PDF report: colour
//! scale, annotations and labels. Painting lives in `ui` and `pdf`.

use crate::matrix::MarginMatrix;
use crate::model::{CustomerSize, CustomerType};

pub type Rgb = [u8; 3];

/// Diverging blue-white-red ramp (matplotlib "coolwarm").
const COOLWARM: [(f64, Rgb); 5] = [
    (0.00, [59, 76, 192]),
    (0.25, [141, 176, 254]),
    (0.50, [221, 221, 221]),
    (0.75, [244, 154, 123]),
    (1.00, [180, 4, 38]),
];

pub fn coolwarm(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.5 } else { t.clamp(0.0, 1.0) };
    for pair in COOLWARM.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
            return [mix(c0[0], c1[0]), mix(c0[1], c1[1]), mix(c0[2], c1[2])];
        }
    }
    COOLWARM[COOLWARM.len() - 1].1
}

/// Dark text on light cells, light text on dark cells.
pub fn text_color(bg: Rgb) -> Rgb {
    let channel = |c: u8| {
        let c = c as f64 / 255.0;
        if c <= 0.03928 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
    };
    let lum = 0.2126 * channel(bg[0]) + 0.7152 * channel(bg[1]) + 0.0722 * channel(bg[2]);
    if lum > 0.408 { [38, 38, 38] } else { [255, 255, 255] }
}

pub fn annotation(value: f64) -> String {
    format!("{:.2}", value)
}

/// Linear colour scale spanning the defined values of one matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn for_matrix(matrix: &MarginMatrix) -> Option<Self> {
        matrix.value_range().map(|(min, max)| Self { min, max })
    }

    pub fn position(&self, value: f64) -> f64 {
        if self.max > self.min {
            (value - self.min) / (self.max - self.min)
        } else {
            0.5
        }
    }

    pub fn color(&self, value: f64) -> Rgb {
        coolwarm(self.position(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub row: usize,
    pub col: usize,
    pub fill: Rgb,
    pub text: String,
    pub text_color: Rgb,
}

/// One titled heatmap, ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub title: String,
    pub row_labels: Vec<&'static str>,
    pub col_labels: Vec<&'static str>,
    /// Only defined cells; undefined cells are left blank.
    pub cells: Vec<HeatmapCell>,
    pub scale: Option<ColorScale>,
}

impl Heatmap {
    pub fn new(title: impl Into<String>, matrix: &MarginMatrix) -> Self {
        let scale = ColorScale::for_matrix(matrix);
        let cells = match scale {
            Some(scale) => matrix
                .iter()
                .filter_map(|(ctype, csize, value)| {
                    let v = value?;
                    let fill = scale.color(v);
                    Some(HeatmapCell {
                        row: ctype.index(),
                        col: csize.index(),
                        fill,
                        text: annotation(v),
                        text_color: text_color(fill),
                    })
                })
                .collect(),
            None => Vec::new(),
        };
        Self {
            title: title.into(),
            row_labels: CustomerType::ALL.iter().map(|t| t.code()).collect(),
            col_labels: CustomerSize::ALL.iter().map(|s| s.code()).collect(),
            cells,
            scale,
        }
    }

    /// Ticks for the colour bar: min, middle, max.
    pub fn legend_ticks(&self) -> Vec<(f64, String)> {
        match self.scale {
            Some(s) if s.max > s.min => {
                let mid = (s.min + s.max) / 2.0;
                vec![(0.0, annotation(s.min)), (0.5, annotation(mid)), (1.0, annotation(s.max))]
            }
            Some(s) => vec![(0.5, annotation(s.min))],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ideal_margin_matrix;

    #[test]
    fn ramp_endpoints_and_middle() {
        assert_eq!(coolwarm(0.0), [59, 76, 192]);
        assert_eq!(coolwarm(0.5), [221, 221, 221]);
        assert_eq!(coolwarm(1.0), [180, 4, 38]);
        assert_eq!(coolwarm(-3.0), coolwarm(0.0));
        assert_eq!(coolwarm(f64::NAN), coolwarm(0.5));
    }

    #[test]
    fn text_contrasts_with_fill() {
        assert_eq!(text_color([221, 221, 221]), [38, 38, 38]);
        assert_eq!(text_color([59, 76, 192]), [255, 255, 255]);
    }

    #[test]
    fn annotations_have_two_decimals() {
        assert_eq!(annotation(45.0), "45.00");
        assert_eq!(annotation(-1.005), "-1.00");
    }

    #[test]
    fn ideal_heatmap_spans_policy_range() {
        let h = Heatmap::new("Ideal", &ideal_margin_matrix());
        assert_eq!(h.cells.len(), 25);
        assert_eq!(h.scale, Some(ColorScale { min: 28.0, max: 50.0 }));
        assert_eq!(h.row_labels, vec!["IND_OEM", "MOB_OEM", "JOBBER", "USER", "TP"]);
        assert_eq!(h.col_labels, vec!["HUGE", "LARGE", "MED", "SMALL", "TINY"]);
        assert_eq!(h.legend_ticks().len(), 3);
    }

    #[test]
    fn undefined_cells_are_blank() {
        let m = MarginMatrix::from_fn(|t, s| {
            (t == CustomerType::Jobber && s == CustomerSize::Small).then_some(-1.0)
        });
        let h = Heatmap::new("Diff", &m);
        assert_eq!(h.cells.len(), 1);
        assert_eq!(h.cells[0].text, "-1.00");
        assert_eq!((h.cells[0].row, h.cells[0].col), (2, 3));
        // A single value sits in the middle of the ramp.
        assert_eq!(h.cells[0].fill, coolwarm(0.5));
        assert!(Heatmap::new("None", &MarginMatrix::empty()).cells.is_empty());
    }
}
