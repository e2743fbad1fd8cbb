//! Spot aggregation and statistics.
//!
//! Every metric is a pure function of the loaded spots. Ties are always
//! broken explicitly so that the same dataset produces the same summary.

use crate::config::AnalysisConfig;
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{
    CallSignCount, CountryCount, Dataset, DistanceBin, FurthestSpot, HourlyDistance,
    MetricsSummary, Spot, StationReach, SummaryCounts,
};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Parameters of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Length of the top call sign and furthest station lists.
    pub top_n: usize,
    /// Width of the fixed distance bins in km.
    pub bin_width_km: f64,
    /// Cap on regular fixed bins; the rest lands in the overflow bin.
    pub max_bins: usize,
    /// Number of logarithmic bins.
    pub log_bins: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for AnalysisOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            top_n: config.top_n,
            bin_width_km: config.bin_width_km,
            max_bins: config.max_bins,
            log_bins: config.log_bins,
        }
    }
}

impl AnalysisOptions {
    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.top_n == 0 {
            return Err(AnalyticsError::Configuration(
                "top_n must be at least 1".to_string(),
            ));
        }
        if !(self.bin_width_km > 0.0) || !self.bin_width_km.is_finite() {
            return Err(AnalyticsError::Configuration(format!(
                "bin width must be a positive number of km, got {}",
                self.bin_width_km
            )));
        }
        if self.max_bins == 0 || self.log_bins == 0 {
            return Err(AnalyticsError::Configuration(
                "bin counts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Compute the full metrics summary for a dataset.
///
/// Fails with [`AnalyticsError::EmptyDataset`] when the dataset holds no
/// valid spots, however many rows were skipped.
pub fn analyse(dataset: &Dataset, options: &AnalysisOptions) -> AnalyticsResult<MetricsSummary> {
    options.validate()?;

    if dataset.is_empty() {
        return Err(AnalyticsError::EmptyDataset {
            skipped: dataset.skipped,
        });
    }

    let spots = dataset.spots.as_slice();
    debug!(
        "Analysing {} spots (top_n={}, bin_width={} km)",
        spots.len(),
        options.top_n,
        options.bin_width_km
    );

    Ok(MetricsSummary {
        counts: summary_counts(dataset),
        hourly: hourly_distance(spots),
        top_call_signs: top_call_signs(spots, options.top_n),
        furthest: furthest_spots(spots, options.top_n),
        furthest_by_reporter: furthest_by_reporter(spots, options.top_n),
        countries: country_counts(spots),
        distance_bins: distance_bins(spots, options.bin_width_km, options.max_bins),
        log_distance_bins: log_distance_bins(spots, options.log_bins),
        skipped: dataset.skipped,
    })
}

/// Row, pair, reporter and grid counts.
pub fn summary_counts(dataset: &Dataset) -> SummaryCounts {
    let spots = &dataset.spots;

    let pairs: HashSet<(&str, &str)> = spots
        .iter()
        .map(|s| (s.reporter_call.as_str(), s.transmitter_call.as_str()))
        .collect();

    let reporters: HashSet<&str> = spots.iter().map(|s| s.reporter_call.as_str()).collect();

    let grids: HashSet<String> = spots
        .iter()
        .flat_map(|s| [&s.reporter_grid, &s.transmitter_grid])
        .filter(|g| !g.trim().is_empty())
        .map(|g| g.trim().to_ascii_uppercase())
        .collect();

    let grids_4: HashSet<String> = grids
        .iter()
        .map(|g| g.chars().take(4).collect())
        .collect();

    SummaryCounts {
        total_rows: dataset.total_rows(),
        valid_rows: spots.len(),
        skipped_rows: dataset.skipped,
        unique_spots: pairs.len(),
        unique_reporters: reporters.len(),
        unique_grids: grids.len(),
        unique_grids_4: grids_4.len(),
    }
}

/// Mean, min and max distance per UTC hour of day.
///
/// Hours without spots are omitted rather than reported as zero.
pub fn hourly_distance(spots: &[Spot]) -> Vec<HourlyDistance> {
    struct Acc {
        count: usize,
        sum: f64,
        min: f64,
        max: f64,
    }

    let mut by_hour: BTreeMap<u32, Acc> = BTreeMap::new();

    for spot in spots {
        let acc = by_hour.entry(spot.hour()).or_insert(Acc {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        });
        acc.count += 1;
        acc.sum += spot.distance;
        acc.min = acc.min.min(spot.distance);
        acc.max = acc.max.max(spot.distance);
    }

    by_hour
        .into_iter()
        .map(|(hour, acc)| HourlyDistance {
            hour,
            spots: acc.count,
            mean_km: acc.sum / acc.count as f64,
            min_km: acc.min,
            max_km: acc.max,
        })
        .collect()
}

/// The `n` most frequent reporters, ties broken by call sign ascending.
pub fn top_call_signs(spots: &[Spot], n: usize) -> Vec<CallSignCount> {
    let mut by_call: HashMap<&str, (usize, HashMap<&str, usize>)> = HashMap::new();

    for spot in spots {
        let entry = by_call.entry(spot.reporter_call.as_str()).or_default();
        entry.0 += 1;
        if !spot.reporter_grid.is_empty() {
            *entry.1.entry(spot.reporter_grid.as_str()).or_default() += 1;
        }
    }

    let mut counts: Vec<CallSignCount> = by_call
        .into_iter()
        .map(|(call, (count, grids))| CallSignCount {
            call_sign: call.to_string(),
            count,
            grid: most_common(&grids).unwrap_or_default(),
        })
        .collect();

    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.call_sign.cmp(&b.call_sign))
    });
    counts.truncate(n);
    counts
}

/// Most frequent key; ties go to the smallest key.
fn most_common(counts: &HashMap<&str, usize>) -> Option<String> {
    counts
        .iter()
        .min_by_key(|(key, count)| (Reverse(**count), **key))
        .map(|(key, _)| key.to_string())
}

/// Ranking used for furthest-station lists.
///
/// Distance descending, then timestamp ascending, then reporter and
/// transmitter call sign ascending. `furthest_first(b, a)` is the
/// nearest-first order.
pub fn furthest_first(a: &Spot, b: &Spot) -> Ordering {
    b.distance
        .total_cmp(&a.distance)
        .then_with(|| a.timestamp.cmp(&b.timestamp))
        .then_with(|| a.reporter_call.cmp(&b.reporter_call))
        .then_with(|| a.transmitter_call.cmp(&b.transmitter_call))
}

/// The `n` spots with the greatest distance.
pub fn furthest_spots(spots: &[Spot], n: usize) -> Vec<FurthestSpot> {
    let mut ranked: Vec<&Spot> = spots.iter().collect();
    ranked.sort_by(|a, b| furthest_first(a, b));
    ranked.into_iter().take(n).map(FurthestSpot::from).collect()
}

/// Each reporter's furthest spot with its total spot count, best `n` first.
pub fn furthest_by_reporter(spots: &[Spot], n: usize) -> Vec<StationReach> {
    let mut best: HashMap<&str, (&Spot, usize)> = HashMap::new();

    for spot in spots {
        best.entry(spot.reporter_call.as_str())
            .and_modify(|(current, count)| {
                *count += 1;
                if furthest_first(spot, current) == Ordering::Less {
                    *current = spot;
                }
            })
            .or_insert((spot, 1));
    }

    let mut ranked: Vec<(&Spot, usize)> = best.into_values().collect();
    ranked.sort_by(|a, b| furthest_first(a.0, b.0));

    ranked
        .into_iter()
        .take(n)
        .map(|(spot, count)| StationReach {
            call_sign: spot.reporter_call.clone(),
            grid: spot.reporter_grid.clone(),
            distance_km: spot.distance,
            spots: count,
        })
        .collect()
}

/// Spots per country, most first, ties by name ascending.
pub fn country_counts(spots: &[Spot]) -> Vec<CountryCount> {
    let mut by_country: BTreeMap<&str, usize> = BTreeMap::new();
    for spot in spots {
        *by_country.entry(spot.country.as_str()).or_default() += 1;
    }

    let mut counts: Vec<CountryCount> = by_country
        .into_iter()
        .map(|(country, spots)| CountryCount {
            country: country.to_string(),
            spots,
        })
        .collect();

    // Stable sort keeps the BTreeMap's name order within equal counts.
    counts.sort_by_key(|c| Reverse(c.spots));
    counts
}

/// Dense fixed-width histogram `[k*w, (k+1)*w)` plus an overflow bin.
///
/// Enough regular bins are emitted to reach the furthest spot, at most
/// `max_bins`. The overflow bin always follows the last regular bin and
/// is only non-empty when the cap was hit.
pub fn distance_bins(spots: &[Spot], width: f64, max_bins: usize) -> Vec<DistanceBin> {
    let max = spots
        .iter()
        .map(|s| s.distance)
        .fold(0.0_f64, f64::max);

    // `as usize` saturates for very narrow bins.
    let needed = ((max / width).floor() as usize).saturating_add(1);
    let regular = needed.min(max_bins);

    let mut counts = vec![0usize; regular + 1];
    for spot in spots {
        let index = ((spot.distance / width).floor() as usize).min(regular);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, spots)| DistanceBin {
            lower_km: i as f64 * width,
            upper_km: (i < regular).then(|| (i + 1) as f64 * width),
            spots,
        })
        .collect()
}

/// Dense histogram of `bins` equal-width bins in `ln(1 + km)` space.
///
/// Spans the observed minimum to maximum; the last bin includes the maximum.
/// A dataset where every distance is equal yields a single bin.
pub fn log_distance_bins(spots: &[Spot], bins: usize) -> Vec<DistanceBin> {
    let (min, max) = spots.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, s| {
        (acc.0.min(s.distance), acc.1.max(s.distance))
    });
    if spots.is_empty() || bins == 0 {
        return Vec::new();
    }

    let (log_min, log_max) = (min.ln_1p(), max.ln_1p());
    let step = (log_max - log_min) / bins as f64;

    if step <= 0.0 {
        return vec![DistanceBin {
            lower_km: min,
            upper_km: Some(max),
            spots: spots.len(),
        }];
    }

    let mut counts = vec![0usize; bins];
    for spot in spots {
        let index = ((spot.distance.ln_1p() - log_min) / step).floor() as usize;
        counts[index.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, spots)| {
            let lower = if i == 0 {
                min
            } else {
                (log_min + i as f64 * step).exp_m1()
            };
            let upper = if i == bins - 1 {
                max
            } else {
                (log_min + (i + 1) as f64 * step).exp_m1()
            };
            DistanceBin {
                lower_km: lower,
                upper_km: Some(upper),
                spots,
            }
        })
        .collect()
}
