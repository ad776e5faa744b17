//! Uniform-bin timing histograms with deferred or fixed ranges

use itertools::Itertools;
use itertools::MinMaxResult;

/// A histogram of `f64` samples over uniformly spaced bins.
///
/// Two lifecycles. A fixed-range histogram knows its span up front and
/// bins every sample as it arrives. A deferred-range histogram buffers
/// raw samples until [`finalize`](Self::finalize), then derives its range
/// so the first and last bin centers land on the smallest and largest
/// sample seen.
///
/// Summary statistics are cached and recomputed only when the bins have
/// changed since the last query.
#[derive(Clone, Debug)]
pub struct Histogram {
    n_bins: usize,
    values: Vec<f64>,
    bins: Vec<f64>,
    centers: Vec<f64>,
    bin_width: f64,
    start_range: f64,
    range: Option<(f64, f64)>,
    dirty: bool,
    sample_count: f64,
    normalized: Vec<f64>,
    mean: f64,
    sigma: f64,
}

impl Histogram {
    /// A histogram that buffers samples and picks its own range on
    /// [`finalize`](Self::finalize)
    pub fn deferred(n_bins: usize) -> Histogram {
        assert!(n_bins > 0, "a histogram takes at least one bin");
        Histogram {
            n_bins,
            values: Vec::new(),
            bins: Vec::new(),
            centers: Vec::new(),
            bin_width: 0.0,
            start_range: 0.0,
            range: None,
            dirty: false,
            sample_count: 0.0,
            normalized: Vec::new(),
            mean: 0.0,
            sigma: 0.0,
        }
    }

    /// A histogram with bin centers running from `lo` to `hi`. Samples
    /// bin in constant time from the first call to [`add`](Self::add).
    pub fn fixed(n_bins: usize, lo: f64, hi: f64) -> Histogram {
        assert!(lo < hi, "histogram range must satisfy low < high");
        let mut h = Histogram::deferred(n_bins);
        h.establish(lo, hi);
        h
    }

    /// Record one sample. Until the range is established the sample is
    /// buffered; afterwards it bins in constant time, and samples landing
    /// outside the binned span are dropped.
    pub fn add(&mut self, value: f64) {
        if self.range.is_none() {
            self.values.push(value);
            return;
        }
        let idx = ((value - self.start_range) / self.bin_width).floor();
        if idx >= 0.0 && idx < self.bins.len() as f64 {
            self.bins[idx as usize] += 1.0;
            self.dirty = true;
        }
    }

    /// Derive the range from the buffered samples and bin them all.
    /// Does nothing once a range is established.
    pub fn finalize(&mut self) {
        if self.range.is_some() {
            return;
        }
        let (lo, hi) = match self.values.iter().minmax() {
            MinMaxResult::NoElements => (0.0, 1.0),
            MinMaxResult::OneElement(&v) => (v, v),
            MinMaxResult::MinMax(&lo, &hi) => (lo, hi),
        };
        self.establish(lo, hi);
        let values = std::mem::take(&mut self.values);
        for v in values {
            self.add(v);
        }
    }

    /// Center-anchored binning: centers run from `lo` to `hi` inclusive,
    /// and each bin spans half a width to either side of its center.
    fn establish(&mut self, lo: f64, hi: f64) {
        // A zero-width span cannot hold bins; pad half a unit per side
        let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
        if self.n_bins == 1 {
            self.bin_width = hi - lo;
            self.start_range = lo;
            self.centers = vec![(lo + hi) / 2.0];
        } else {
            let width = (hi - lo) / (self.n_bins - 1) as f64;
            self.bin_width = width;
            self.start_range = lo - width / 2.0;
            self.centers = (0..self.n_bins).map(|i| lo + i as f64 * width).collect();
        }
        self.bins = vec![0.0; self.n_bins];
        self.range = Some((lo, hi));
        self.dirty = true;
    }

    fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        let total: f64 = self.bins.iter().sum();
        self.sample_count = total;
        if total == 0.0 {
            self.normalized = vec![0.0; self.bins.len()];
            self.mean = 0.0;
            self.sigma = 0.0;
        } else {
            let width = self.bin_width;
            self.normalized = self.bins.iter().map(|&b| b / (total * width)).collect();
            let mean = self
                .normalized
                .iter()
                .zip(&self.centers)
                .map(|(n, c)| n * c)
                .sum::<f64>()
                * width;
            let var = self
                .normalized
                .iter()
                .zip(&self.centers)
                .map(|(n, c)| n * (c - mean).powi(2))
                .sum::<f64>()
                * width;
            self.mean = mean;
            self.sigma = var.sqrt();
        }
        self.dirty = false;
    }

    /// Counts per bin. Empty until the range is established.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Bin centers, same length as [`bins`](Self::bins)
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// First and last bin centers, once established
    pub fn range(&self) -> Option<(f64, f64)> {
        self.range
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    /// Number of binned samples, excluding any that fell outside the span
    pub fn sample_count(&mut self) -> f64 {
        self.refresh();
        self.sample_count
    }

    /// Bins scaled so the histogram integrates to one
    pub fn normalized_bins(&mut self) -> &[f64] {
        self.refresh();
        &self.normalized
    }

    /// First moment of the normalized histogram
    pub fn mean(&mut self) -> f64 {
        self.refresh();
        self.mean
    }

    /// Square root of the second central moment
    pub fn sigma(&mut self) -> f64 {
        self.refresh();
        self.sigma
    }
}
