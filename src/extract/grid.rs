// File: src/extract/grid.rs
//! Geometry of the annual 6×2 month grid, inferred from pixel brightness.
//!
//! The posters this was calibrated on have white rule lines between months and
//! text-filled cells. Rule lines are therefore the brightest rows/columns in
//! the areas where we expect them. All positions are truncated to whole
//! pixels the same way everywhere (`frac`).
use image::DynamicImage;
use ndarray::{Array2, Axis, s};

// --- Calibration constants (fractions of image height H / width W) ---
//
// Measured on the "Calendar Științific" poster family: a title band at the
// top, two month rows, a footer with sponsors at the bottom.

/// The rule between the two month rows is searched within [40%H, 60%H).
pub const SEPARATOR_SEARCH_TOP: f64 = 0.40;
pub const SEPARATOR_SEARCH_BOTTOM: f64 = 0.60;
/// ...and only in [10%W, 90%W), which skips the bright page margins.
pub const SEPARATOR_SEARCH_LEFT: f64 = 0.10;
pub const SEPARATOR_SEARCH_RIGHT: f64 = 0.90;

/// First month row starts below the title and month-name headers.
pub const ROW1_TOP: f64 = 0.130;
/// Gap kept above the row separator so the rule itself is not cropped in.
pub const ROW1_GAP_ABOVE_SEPARATOR: f64 = 0.015;
/// Row 1 is at least this tall even when the separator is found very high.
pub const ROW_MIN_HEIGHT_PX: u32 = 10;
/// Gap kept below the row separator.
pub const ROW2_GAP_BELOW_SEPARATOR: f64 = 0.010;
/// Row 2 never starts lower than this.
pub const ROW2_TOP_LIMIT: f64 = 0.95;
/// Row 2 ends above the sponsor footer.
pub const ROW2_BOTTOM: f64 = 0.900;

/// Horizontal extent of the six month columns.
pub const COLUMNS_LEFT: f64 = 0.025;
pub const COLUMNS_RIGHT: f64 = 0.975;

pub const SMOOTHING_WINDOW: usize = 20;
/// Minimum smoothed brightness (0-255) for a column rule.
pub const SEPARATOR_MIN_BRIGHTNESS: f32 = 200.0;
/// Column rules are at least W/9 apart (six columns over ~95% of W).
pub const SEPARATOR_SPACING_DIVISOR: u32 = 9;

pub const MONTHS_PER_ROW: usize = 6;
pub const SEPARATORS_PER_ROW: usize = MONTHS_PER_ROW - 1;

fn frac(total: u32, fraction: f64) -> u32 {
    (total as f64 * fraction) as u32
}

/// 8-bit luma of the whole image as a `height × width` array.
pub struct Brightness {
    data: Array2<f32>,
}

impl Brightness {
    pub fn from_image(image: &DynamicImage) -> Self {
        let gray = image.to_luma8();
        let (w, h) = gray.dimensions();
        let data = Array2::from_shape_vec((h as usize, w as usize), gray.into_raw())
            .map(|a| a.mapv(f32::from))
            .unwrap_or_else(|_| Array2::zeros((h as usize, w as usize)));
        Self { data }
    }

    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    /// Mean of each row over `y0..y1`, restricted to columns `x0..x1`.
    pub fn row_means(&self, y0: u32, y1: u32, x0: u32, x1: u32) -> Vec<f32> {
        let (y1, x1) = (y1.min(self.height()), x1.min(self.width()));
        if y0 >= y1 || x0 >= x1 {
            return vec![];
        }
        self.data
            .slice(s![y0 as usize..y1 as usize, x0 as usize..x1 as usize])
            .mean_axis(Axis(1))
            .map(|a| a.to_vec())
            .unwrap_or_default()
    }

    /// Mean of each column over rows `y0..y1`.
    pub fn column_means(&self, y0: u32, y1: u32) -> Vec<f32> {
        let y1 = y1.min(self.height());
        if y0 >= y1 {
            return vec![0.0; self.width() as usize];
        }
        self.data
            .slice(s![y0 as usize..y1 as usize, ..])
            .mean_axis(Axis(0))
            .map(|a| a.to_vec())
            .unwrap_or_default()
    }
}

/// Centered moving average with zero padding; output has the input's length.
pub fn smooth(values: &[f32], window: usize) -> Vec<f32> {
    let n = values.len();
    if window <= 1 || n == 0 {
        return values.to_vec();
    }
    let left = window / 2;
    let mut prefix = vec![0.0f64; n + 1];
    for (i, v) in values.iter().enumerate() {
        prefix[i + 1] = prefix[i] + *v as f64;
    }
    (0..n)
        .map(|x| {
            let lo = x.saturating_sub(left);
            let hi = (x + window - left).min(n);
            ((prefix[hi] - prefix[lo]) / window as f64) as f32
        })
        .collect()
}

/// Up to five column rules in a smoothed brightness profile, sorted by x.
///
/// A candidate is a point equal to the maximum of its ±`W/9` neighbourhood,
/// strictly brighter than something in it, and brighter than
/// `SEPARATOR_MIN_BRIGHTNESS`. Candidates are taken brightest
/// first, skipping any closer than `W/9` to one already taken.
pub fn find_separators(profile: &[f32]) -> Vec<u32> {
    let width = profile.len();
    let min_dist = width / SEPARATOR_SPACING_DIVISOR as usize;
    if min_dist == 0 || width <= 2 * min_dist {
        return vec![];
    }

    let mut candidates: Vec<(usize, f32)> = (min_dist..width - min_dist)
        .filter_map(|x| {
            let lo = x.saturating_sub(min_dist);
            let hi = (x + min_dist).min(width);
            let window = &profile[lo..hi];
            let local_max = window.iter().copied().fold(f32::MIN, f32::max);
            let local_min = window.iter().copied().fold(f32::MAX, f32::min);
            let v = profile[x];
            // A flat neighbourhood (blank paper) is not a rule line.
            (v >= local_max && v > local_min && v > SEPARATOR_MIN_BRIGHTNESS).then_some((x, v))
        })
        .collect();
    // Stable: equal brightness keeps left-to-right order.
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut accepted: Vec<usize> = Vec::with_capacity(SEPARATORS_PER_ROW);
    for (x, _) in candidates {
        if accepted.len() == SEPARATORS_PER_ROW {
            break;
        }
        if accepted.iter().all(|&a| a.abs_diff(x) >= min_dist) {
            accepted.push(x);
        }
    }
    accepted.sort_unstable();
    accepted.into_iter().map(|x| x as u32).collect()
}

/// Seven x positions delimiting six month columns.
pub fn column_bounds(separators: &[u32], width: u32) -> [u32; MONTHS_PER_ROW + 1] {
    let left = frac(width, COLUMNS_LEFT);
    let right = frac(width, COLUMNS_RIGHT);
    let mut xs = [0u32; MONTHS_PER_ROW + 1];
    if separators.len() == SEPARATORS_PER_ROW {
        xs[0] = left;
        xs[1..=SEPARATORS_PER_ROW].copy_from_slice(separators);
        xs[MONTHS_PER_ROW] = right;
    } else {
        let cw = right.saturating_sub(left) / MONTHS_PER_ROW as u32;
        for (i, x) in xs.iter_mut().enumerate() {
            *x = left + i as u32 * cw;
        }
        // The last column absorbs the integer-division remainder.
        xs[MONTHS_PER_ROW] = right;
    }
    xs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    pub y0: u32,
    pub y1: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthRegion {
    pub month: u32,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl MonthRegion {
    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGeometry {
    pub mid_y: u32,
    pub rows: [RowBand; 2],
    pub separators: [Vec<u32>; 2],
    pub columns: [[u32; MONTHS_PER_ROW + 1]; 2],
}

impl GridGeometry {
    pub fn detect(brightness: &Brightness) -> Self {
        let (w, h) = (brightness.width(), brightness.height());

        let search_top = frac(h, SEPARATOR_SEARCH_TOP);
        let row_profile = brightness.row_means(
            search_top,
            frac(h, SEPARATOR_SEARCH_BOTTOM),
            frac(w, SEPARATOR_SEARCH_LEFT),
            frac(w, SEPARATOR_SEARCH_RIGHT),
        );
        let mut brightest = 0usize;
        for (i, v) in row_profile.iter().enumerate() {
            if *v > row_profile[brightest] {
                brightest = i;
            }
        }
        let mid_y = search_top + brightest as u32;

        let row1_top = frac(h, ROW1_TOP);
        let rows = [
            RowBand {
                y0: row1_top,
                y1: (row1_top + ROW_MIN_HEIGHT_PX)
                    .max(mid_y.saturating_sub(frac(h, ROW1_GAP_ABOVE_SEPARATOR))),
            },
            RowBand {
                y0: (mid_y + frac(h, ROW2_GAP_BELOW_SEPARATOR)).min(frac(h, ROW2_TOP_LIMIT)),
                y1: frac(h, ROW2_BOTTOM),
            },
        ];

        let separators = rows.map(|band| {
            let profile = smooth(&brightness.column_means(band.y0, band.y1), SMOOTHING_WINDOW);
            find_separators(&profile)
        });
        let columns = [
            column_bounds(&separators[0], w),
            column_bounds(&separators[1], w),
        ];

        log::debug!(
            "Grid: mid_y={} rows={:?} separators={:?}",
            mid_y,
            rows,
            separators
        );

        Self {
            mid_y,
            rows,
            separators,
            columns,
        }
    }

    /// Twelve regions in row-major month order (January first).
    pub fn month_regions(&self) -> Vec<MonthRegion> {
        let mut regions = Vec::with_capacity(2 * MONTHS_PER_ROW);
        for (row_idx, band) in self.rows.iter().enumerate() {
            let xs = &self.columns[row_idx];
            for col in 0..MONTHS_PER_ROW {
                regions.push(MonthRegion {
                    month: (row_idx * MONTHS_PER_ROW + col + 1) as u32,
                    x0: xs[col],
                    y0: band.y0,
                    x1: xs[col + 1],
                    y1: band.y1,
                });
            }
        }
        regions
    }
}
