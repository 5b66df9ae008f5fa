//! Carrier recommendation and scoring.
//!
//! Takes the historical carrier dataset and a requested route, matches
//! carriers at city or province level, scores them on delivery speed,
//! reliability and cost, and buckets the survivors into lead temperatures.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use freightlead_dataset::CarrierDataset;
use freightlead_features::{
    logistic_confidence, normalize_location, percentile, stepped_logistic_confidence,
    PercentileError,
};
use freightlead_model::{CarrierRecord, LeadTemperature, LocationQuery, MatchTier, ScoredCarrier};
use serde::Deserialize;
use thiserror::Error;

pub const TRANSPORT_MAX: f64 = 5.0;
pub const RELIABILITY_MAX: f64 = 5.0;
pub const COST_MAX: f64 = 10.0;

/// Score given when every candidate shares the same value.
const UNDIFFERENTIATED_SCORE: f64 = 5.0;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("No carriers found for the specified locations.")]
    NoMatch,
}

/// Configuration for the recommendation engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Added to the composite score of city-level matches
    pub city_bonus: f64,
    /// Added to the composite score of province-level matches
    pub state_bonus: f64,
    /// Request count at which delivery speed gets half confidence
    pub transport_pivot: f64,
    /// Request count at which reliability gets half confidence
    pub reliability_pivot: f64,
    /// Deliveries faster than this many days need a real track record
    pub fast_delivery_days: f64,
    /// Request count below which fast deliveries are distrusted
    pub thin_history_requests: u32,
    /// Multiplier applied to distrusted fast deliveries
    pub thin_history_factor: f64,
    /// Maximum carriers returned
    pub max_results: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            city_bonus: 5.0,
            state_bonus: -5.0,
            transport_pivot: 10.0,
            reliability_pivot: 3.0,
            fast_delivery_days: 2.0,
            thin_history_requests: 6,
            thin_history_factor: 0.3,
            max_results: 14,
        }
    }
}

impl RecommendConfig {
    pub fn tier_bonus(&self, tier: MatchTier) -> f64 {
        match tier {
            MatchTier::CityMatch => self.city_bonus,
            MatchTier::StateMatch => self.state_bonus,
        }
    }
}

/// Smallest and largest present value of a field across the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Bounds { min: v, max: v }),
            Some(b) => Some(Bounds { min: b.min.min(v), max: b.max.max(v) }),
        })
    }

    fn is_flat(&self) -> bool {
        self.min == self.max
    }
}

/// Recommend carriers for a route.
///
/// Returns at most `config.max_results` carriers, lowest composite score first.
pub fn recommend(
    dataset: &CarrierDataset,
    query: &LocationQuery,
    config: &RecommendConfig,
) -> Result<Vec<ScoredCarrier>, RecommendError> {
    let candidates = match_candidates(dataset.records(), query);
    if candidates.is_empty() {
        tracing::info!(
            pickup = %query.pickup_city,
            destination = %query.destination_city,
            "No carriers matched at city or province level"
        );
        return Err(RecommendError::NoMatch);
    }

    let malformed: HashSet<String> = candidates
        .iter()
        .filter(|c| c.malformed)
        .map(|c| c.record.carrier_name.clone())
        .collect();
    let mut scored = score_candidates(candidates, config);

    // Highest score first, so the cap keeps the best carriers
    scored.sort_by(|a, b| by_score(b, a));
    let mut seen = HashSet::new();
    scored.retain(|c| seen.insert(c.record.carrier_name.clone()));
    scored.truncate(config.max_results);
    scored.sort_by(by_score);

    assign_temperatures(&mut scored);
    for carrier in scored.iter_mut().filter(|c| malformed.contains(&c.record.carrier_name)) {
        carrier.temperature = None;
    }

    tracing::debug!(
        carriers = ?scored.iter().map(|c| c.carrier_name()).collect::<Vec<_>>(),
        "Recommended carriers"
    );

    Ok(scored)
}

/// A dataset row (or province-level aggregate) that matched the route.
#[derive(Debug, Clone)]
struct Candidate {
    record: CarrierRecord,
    tier: MatchTier,
    /// Malformed numeric input was replaced by "missing"
    malformed: bool,
}

/// Select carriers at city level, then at province level for everyone else.
fn match_candidates(records: &[CarrierRecord], query: &LocationQuery) -> Vec<Candidate> {
    let pickup_city = normalize_location(&query.pickup_city);
    let destination_city = normalize_location(&query.destination_city);
    let pickup_province = normalize_location(&query.pickup_province);
    let destination_province = normalize_location(&query.destination_province);

    let city_rows: Vec<&CarrierRecord> = if pickup_city.is_empty() || destination_city.is_empty() {
        Vec::new()
    } else {
        records
            .iter()
            .filter(|r| {
                normalize_location(&r.pickup_city) == pickup_city
                    && normalize_location(&r.destination_city) == destination_city
            })
            .collect()
    };

    let city_carriers: HashSet<&str> = city_rows.iter().map(|r| r.carrier_name.as_str()).collect();

    let state_rows: Vec<&CarrierRecord> =
        if pickup_province.is_empty() || destination_province.is_empty() {
            Vec::new()
        } else {
            records
                .iter()
                .filter(|r| !city_carriers.contains(r.carrier_name.as_str()))
                .filter(|r| {
                    normalize_location(&r.pickup_province) == pickup_province
                        && normalize_location(&r.destination_province) == destination_province
                })
                .collect()
        };

    tracing::debug!(
        city_rows = city_rows.len(),
        state_rows = state_rows.len(),
        "Matched dataset rows"
    );

    let mut candidates: Vec<Candidate> = city_rows
        .into_iter()
        .map(|r| sanitize(r.clone(), MatchTier::CityMatch))
        .collect();
    candidates.extend(
        aggregate_by_carrier(&state_rows)
            .into_iter()
            .map(|r| sanitize(r, MatchTier::StateMatch)),
    );

    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert(c.record.carrier_name.clone()));
    candidates
}

/// Running totals for one carrier's province-level rows.
#[derive(Default)]
struct Accumulator {
    record: CarrierRecord,
    request_count: u64,
    transport_requests: Tally,
    avg_cost_per_km: Tally,
    estimated_amount: Tally,
    avg_delivery_days: Tally,
    on_time: Tally,
    late_deliveries: Tally,
}

/// Sum and count of the present values of one field.
#[derive(Default, Clone, Copy)]
struct Tally {
    sum: f64,
    count: u32,
}

impl Tally {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }

    fn total(&self) -> Option<f64> {
        Some(self.sum)
    }
}

fn first_non_empty(slot: &mut String, value: &str) {
    if slot.trim().is_empty() && !value.trim().is_empty() {
        *slot = value.to_string();
    }
}

/// Collapse rows sharing a carrier name into one record per carrier.
///
/// Locations take the first non-empty value; request counts are summed and
/// performance figures averaged. Carriers come out in name order.
fn aggregate_by_carrier(rows: &[&CarrierRecord]) -> Vec<CarrierRecord> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();

    for row in rows {
        let acc = groups.entry(row.carrier_name.as_str()).or_default();
        acc.record.carrier_name = row.carrier_name.clone();
        first_non_empty(&mut acc.record.pickup_city, &row.pickup_city);
        first_non_empty(&mut acc.record.destination_city, &row.destination_city);
        first_non_empty(&mut acc.record.pickup_province, &row.pickup_province);
        first_non_empty(&mut acc.record.destination_province, &row.destination_province);
        first_non_empty(&mut acc.record.pickup_country, &row.pickup_country);
        first_non_empty(&mut acc.record.destination_country, &row.destination_country);

        acc.request_count += u64::from(row.request_count);
        acc.transport_requests.add(row.transport_requests);
        acc.avg_cost_per_km.add(row.avg_cost_per_km);
        acc.estimated_amount.add(row.estimated_amount);
        acc.avg_delivery_days.add(row.avg_delivery_days);
        acc.on_time.add(row.on_time);
        acc.late_deliveries.add(row.late_deliveries);
    }

    groups
        .into_values()
        .map(|acc| CarrierRecord {
            request_count: u32::try_from(acc.request_count).unwrap_or(u32::MAX),
            transport_requests: acc.transport_requests.total(),
            avg_cost_per_km: acc.avg_cost_per_km.mean(),
            estimated_amount: acc.estimated_amount.mean(),
            avg_delivery_days: acc.avg_delivery_days.mean(),
            on_time: acc.on_time.mean(),
            late_deliveries: acc.late_deliveries.mean(),
            ..acc.record
        })
        .collect()
}

/// Replace non-finite or negative numeric fields with "missing".
fn sanitize(mut record: CarrierRecord, tier: MatchTier) -> Candidate {
    let mut malformed = false;
    let carrier = record.carrier_name.clone();

    for (field, value) in [
        ("avg_delivery_days", &mut record.avg_delivery_days),
        ("on_time", &mut record.on_time),
        ("late_deliveries", &mut record.late_deliveries),
        ("estimated_amount", &mut record.estimated_amount),
        ("avg_cost_per_km", &mut record.avg_cost_per_km),
        ("transport_requests", &mut record.transport_requests),
    ] {
        if let Some(v) = *value {
            if !v.is_finite() || v < 0.0 {
                tracing::warn!(carrier = %carrier, field, value = v, "Malformed numeric field treated as missing");
                *value = None;
                malformed = true;
            }
        }
    }

    Candidate { record, tier, malformed }
}

fn score_candidates(candidates: Vec<Candidate>, config: &RecommendConfig) -> Vec<ScoredCarrier> {
    let day_bounds = Bounds::of(candidates.iter().filter_map(|c| c.record.avg_delivery_days));
    let cost_bounds = Bounds::of(candidates.iter().filter_map(|c| c.record.estimated_amount));

    candidates
        .into_iter()
        .map(|candidate| {
            let record = candidate.record;
            let count = record.request_count;

            let transport_score =
                transport_efficiency(record.avg_delivery_days, day_bounds, count, config);
            let reliability_score =
                reliability(record.on_time, record.late_deliveries, count, config);
            let cost_score = cost_efficiency(record.estimated_amount, cost_bounds);
            let composite_score = transport_score
                + reliability_score
                + cost_score
                + config.tier_bonus(candidate.tier);

            ScoredCarrier {
                record,
                match_tier: candidate.tier,
                transport_score,
                reliability_score,
                cost_score,
                composite_score,
                temperature: None,
            }
        })
        .collect()
}

/// Delivery speed score in [0, 5]; faster than the slowest candidate scores higher.
pub fn transport_efficiency(
    avg_days: Option<f64>,
    bounds: Option<Bounds>,
    request_count: u32,
    config: &RecommendConfig,
) -> f64 {
    let (Some(days), Some(bounds)) = (avg_days, bounds) else {
        return 0.0;
    };
    if bounds.is_flat() {
        return UNDIFFERENTIATED_SCORE;
    }
    if bounds.max <= 0.0 {
        return 0.0;
    }

    let raw = (TRANSPORT_MAX - days / bounds.max * TRANSPORT_MAX).max(0.0);
    let count = f64::from(request_count);
    let mut score = raw * stepped_logistic_confidence(count, config.transport_pivot);

    if days < config.fast_delivery_days && request_count < config.thin_history_requests {
        score *= config.thin_history_factor;
    }

    score.clamp(0.0, TRANSPORT_MAX)
}

/// Cost score in [0, 10]; cheaper than the most expensive candidate scores higher.
pub fn cost_efficiency(estimated_amount: Option<f64>, bounds: Option<Bounds>) -> f64 {
    let (Some(cost), Some(bounds)) = (estimated_amount, bounds) else {
        return 0.0;
    };
    if bounds.is_flat() {
        return UNDIFFERENTIATED_SCORE;
    }
    if bounds.max <= 0.0 {
        return 0.0;
    }

    (COST_MAX - cost / bounds.max * COST_MAX).clamp(0.0, COST_MAX)
}

/// On-time ratio score in [0, 5], discounted for short histories.
pub fn reliability(
    on_time: Option<f64>,
    late: Option<f64>,
    request_count: u32,
    config: &RecommendConfig,
) -> f64 {
    let (Some(on_time), Some(late)) = (on_time, late) else {
        return 0.0;
    };
    let total = on_time + late;
    if total <= 0.0 {
        return 0.0;
    }

    let raw = on_time / total * RELIABILITY_MAX;
    let score = raw * logistic_confidence(f64::from(request_count), config.reliability_pivot);
    score.clamp(0.0, RELIABILITY_MAX)
}

/// Bucket a composite score against the distribution it came from.
pub fn categorize(score: f64, sorted_scores: &[f64]) -> Result<LeadTemperature, PercentileError> {
    if sorted_scores.len() < 2 {
        return Ok(LeadTemperature::Cold);
    }

    let temperature = if score >= percentile(sorted_scores, 95.0)? {
        LeadTemperature::VeryHot
    } else if score >= percentile(sorted_scores, 90.0)? {
        LeadTemperature::Hot
    } else if score >= percentile(sorted_scores, 75.0)? {
        LeadTemperature::Warm
    } else if score >= percentile(sorted_scores, 50.0)? {
        LeadTemperature::Moderate
    } else {
        LeadTemperature::Cold
    };

    Ok(temperature)
}

/// Label every carrier with its temperature.
///
/// A failure on the score distribution leaves every carrier unlabelled.
pub fn assign_temperatures(carriers: &mut [ScoredCarrier]) {
    let mut scores: Vec<f64> = carriers.iter().map(|c| c.composite_score).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let labels: Result<Vec<LeadTemperature>, PercentileError> = carriers
        .iter()
        .map(|c| categorize(c.composite_score, &scores))
        .collect();

    match labels {
        Ok(labels) => {
            for (carrier, label) in carriers.iter_mut().zip(labels) {
                carrier.temperature = Some(label);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Lead temperature bucketing failed");
            carriers.iter_mut().for_each(|c| c.temperature = None);
        }
    }
}

fn by_score(a: &ScoredCarrier, b: &ScoredCarrier) -> Ordering {
    a.composite_score
        .partial_cmp(&b.composite_score)
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn acme() -> CarrierRecord {
        CarrierRecord::new("Acme", "Toronto", "Vancouver")
            .with_provinces("ON", "BC")
            .with_delivery_days(3.0)
            .with_amount(500.0)
            .with_deliveries(8.0, 2.0)
            .with_request_count(15)
    }

    fn toronto_vancouver() -> LocationQuery {
        LocationQuery::new("Toronto", "Vancouver").with_provinces("ON", "BC")
    }

    fn run(records: Vec<CarrierRecord>, query: &LocationQuery) -> Result<Vec<ScoredCarrier>, RecommendError> {
        recommend(&CarrierDataset::new(records), query, &RecommendConfig::default())
    }

    fn scored(name: &str, score: f64) -> ScoredCarrier {
        ScoredCarrier {
            record: CarrierRecord::new(name, "a", "b"),
            match_tier: MatchTier::CityMatch,
            transport_score: 0.0,
            reliability_score: 0.0,
            cost_score: 0.0,
            composite_score: score,
            temperature: None,
        }
    }

    #[test]
    fn test_city_match_single_carrier() {
        let hits = run(vec![acme()], &toronto_vancouver()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].carrier_name(), "Acme");
        assert_eq!(hits[0].match_tier, MatchTier::CityMatch);
        // Lone candidate: flat bounds give 5 + 5, reliability 4.0 at full confidence
        assert_eq!(hits[0].transport_score, 5.0);
        assert_eq!(hits[0].cost_score, 5.0);
        assert!((hits[0].reliability_score - 4.0).abs() < 1e-9);
        assert!((hits[0].composite_score - 19.0).abs() < 1e-9);
        assert_eq!(hits[0].temperature, Some(LeadTemperature::Cold));
    }

    #[test]
    fn test_state_match_flips_bonus() {
        let city = run(vec![acme()], &toronto_vancouver()).unwrap();
        let query = LocationQuery::new("Hamilton", "Victoria").with_provinces("on", " bc ");
        let state = run(vec![acme()], &query).unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(state[0].match_tier, MatchTier::StateMatch);
        assert!((city[0].composite_score - state[0].composite_score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_error() {
        let query = LocationQuery::new("Halifax", "Regina").with_provinces("NS", "SK");
        let err = run(vec![acme()], &query).unwrap_err();
        assert!(matches!(err, RecommendError::NoMatch));
        assert_eq!(err.to_string(), "No carriers found for the specified locations.");
    }

    #[test]
    fn test_empty_query_does_not_match_empty_fields() {
        let blank = CarrierRecord::new("Blank", "", "");
        assert!(run(vec![blank], &LocationQuery::default()).is_err());
    }

    #[test]
    fn test_normalized_matching() {
        let record = CarrierRecord::new("Laval Freight", "MontrÃ©al", " QUEBEC ");
        let query = LocationQuery::new("montréal", "Quebec");
        let hits = run(vec![record], &query).unwrap();
        assert_eq!(hits[0].match_tier, MatchTier::CityMatch);
    }

    #[test]
    fn test_city_tier_wins_over_state_tier() {
        let records = vec![
            acme(),
            CarrierRecord::new("Acme", "Ottawa", "Kelowna")
                .with_provinces("ON", "BC")
                .with_delivery_days(9.0),
            CarrierRecord::new("Beta", "Ottawa", "Kelowna")
                .with_provinces("ON", "BC")
                .with_delivery_days(4.0),
        ];
        let hits = run(records, &toronto_vancouver()).unwrap();

        let names: Vec<&str> = hits.iter().map(|c| c.carrier_name()).collect();
        assert_eq!(hits.len(), 2);
        assert!(names.contains(&"Acme") && names.contains(&"Beta"));

        let acme_hit = hits.iter().find(|c| c.carrier_name() == "Acme").unwrap();
        assert_eq!(acme_hit.match_tier, MatchTier::CityMatch);
        assert_eq!(acme_hit.record.pickup_city, "Toronto");
    }

    #[test]
    fn test_state_rows_are_aggregated() {
        let rows = vec![
            CarrierRecord::new("Gamma", "Ottawa", "Kelowna")
                .with_provinces("ON", "BC")
                .with_delivery_days(2.0)
                .with_amount(400.0)
                .with_deliveries(4.0, 0.0)
                .with_request_count(3),
            CarrierRecord::new("Gamma", "", "Surrey")
                .with_provinces("ON", "BC")
                .with_delivery_days(4.0)
                .with_deliveries(6.0, 2.0)
                .with_request_count(5),
        ];
        let refs: Vec<&CarrierRecord> = rows.iter().collect();
        let aggregated = aggregate_by_carrier(&refs);

        assert_eq!(aggregated.len(), 1);
        let gamma = &aggregated[0];
        assert_eq!(gamma.pickup_city, "Ottawa");
        assert_eq!(gamma.destination_city, "Kelowna");
        assert_eq!(gamma.request_count, 8);
        assert_eq!(gamma.avg_delivery_days, Some(3.0));
        assert_eq!(gamma.estimated_amount, Some(400.0));
        assert_eq!(gamma.on_time, Some(5.0));
        assert_eq!(gamma.late_deliveries, Some(1.0));
        assert_eq!(gamma.transport_requests, Some(0.0));
    }

    #[test]
    fn test_output_capped_deduplicated_and_ascending() {
        let mut records = Vec::new();
        for i in 0..30u32 {
            let name = format!("Carrier {}", i % 20);
            records.push(
                CarrierRecord::new(name, "Toronto", "Vancouver")
                    .with_delivery_days(2.0 + f64::from(i))
                    .with_amount(300.0 + 25.0 * f64::from(i))
                    .with_deliveries(f64::from(i), 3.0)
                    .with_request_count(i),
            );
        }
        let hits = run(records, &toronto_vancouver()).unwrap();

        assert_eq!(hits.len(), 14);
        let names: HashSet<&str> = hits.iter().map(|c| c.carrier_name()).collect();
        assert_eq!(names.len(), hits.len());
        assert!(hits.windows(2).all(|w| w[0].composite_score <= w[1].composite_score));
    }

    #[test]
    fn test_transport_flat_bounds() {
        let config = RecommendConfig::default();
        let bounds = Bounds::of([3.0, 3.0]);
        assert_eq!(transport_efficiency(Some(3.0), bounds, 1, &config), 5.0);
        assert_eq!(transport_efficiency(Some(3.0), bounds, 40, &config), 5.0);
    }

    #[test]
    fn test_transport_scoring() {
        let config = RecommendConfig::default();
        let bounds = Bounds::of([2.0, 4.0]);
        assert_eq!(transport_efficiency(None, bounds, 20, &config), 0.0);
        // Slowest candidate gets nothing
        assert_eq!(transport_efficiency(Some(4.0), bounds, 20, &config), 0.0);
        // Half the max at full confidence
        assert!((transport_efficiency(Some(2.0), bounds, 20, &config) - 2.5).abs() < 1e-9);
        // Half confidence at the pivot
        assert!((transport_efficiency(Some(2.0), bounds, 10, &config) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_fast_delivery_with_thin_history_is_penalized() {
        let config = RecommendConfig::default();
        let bounds = Bounds::of([1.0, 4.0]);
        let trusted = transport_efficiency(Some(1.0), bounds, 10, &config);
        let thin = transport_efficiency(Some(1.0), bounds, 5, &config);
        // count 5 gets 1/(1+148), rounded to 0.007, then the 0.3 penalty
        assert!((trusted - 1.875).abs() < 1e-9);
        assert!((thin - 3.75 * 0.007 * 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_cost_scoring() {
        let bounds = Bounds::of([250.0, 1000.0]);
        assert_eq!(cost_efficiency(None, bounds), 0.0);
        assert!((cost_efficiency(Some(250.0), bounds) - 7.5).abs() < 1e-9);
        assert_eq!(cost_efficiency(Some(1000.0), bounds), 0.0);
        assert_eq!(cost_efficiency(Some(700.0), Bounds::of([700.0])), 5.0);
    }

    #[test]
    fn test_reliability_scoring() {
        let config = RecommendConfig::default();
        assert_eq!(reliability(None, Some(3.0), 10, &config), 0.0);
        assert_eq!(reliability(Some(0.0), Some(0.0), 10, &config), 0.0);
        assert!((reliability(Some(8.0), Some(2.0), 15, &config) - 4.0).abs() < 1e-9);
        // Half confidence at the pivot
        assert!((reliability(Some(10.0), Some(0.0), 3, &config) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_scores_stay_in_bounds() {
        let config = RecommendConfig::default();
        let extremes = [0.0, 0.001, 1.0, 1e9, f64::MAX / 4.0];
        let bounds = Bounds::of(extremes);
        for &v in &extremes {
            for count in [0, 1, 5, 10, 1000] {
                let t = transport_efficiency(Some(v), bounds, count, &config);
                let r = reliability(Some(v), Some(v / 2.0), count, &config);
                let c = cost_efficiency(Some(v), bounds);
                assert!((0.0..=TRANSPORT_MAX).contains(&t));
                assert!((0.0..=RELIABILITY_MAX).contains(&r));
                assert!((0.0..=COST_MAX).contains(&c));
            }
        }
    }

    #[test]
    fn test_malformed_row_keeps_scores_without_temperature() {
        let records = vec![
            acme(),
            CarrierRecord::new("Broken", "Toronto", "Vancouver")
                .with_delivery_days(f64::INFINITY)
                .with_amount(250.0)
                .with_request_count(12),
        ];
        let hits = run(records, &toronto_vancouver()).unwrap();
        let broken = hits.iter().find(|c| c.carrier_name() == "Broken").unwrap();
        assert_eq!(broken.temperature, None);
        assert_eq!(broken.transport_score, 0.0);
        assert!(broken.cost_score > 0.0);

        let acme_hit = hits.iter().find(|c| c.carrier_name() == "Acme").unwrap();
        assert!(acme_hit.temperature.is_some());
    }

    #[test]
    fn test_temperature_buckets() {
        let mut carriers: Vec<ScoredCarrier> =
            (1..=20).map(|i| scored(&format!("C{i}"), f64::from(i))).collect();
        assign_temperatures(&mut carriers);

        let temperature = |i: usize| carriers[i - 1].temperature;
        assert_eq!(temperature(20), Some(LeadTemperature::VeryHot));
        assert_eq!(temperature(19), Some(LeadTemperature::Hot));
        assert_eq!(temperature(16), Some(LeadTemperature::Warm));
        assert_eq!(temperature(11), Some(LeadTemperature::Moderate));
        assert_eq!(temperature(10), Some(LeadTemperature::Cold));
        assert_eq!(temperature(1), Some(LeadTemperature::Cold));
    }

    #[test]
    fn test_single_score_is_cold() {
        assert_eq!(categorize(42.0, &[42.0]).unwrap(), LeadTemperature::Cold);
        assert_eq!(categorize(42.0, &[]).unwrap(), LeadTemperature::Cold);
    }

    #[test]
    fn test_bucketing_failure_clears_temperatures() {
        let mut carriers = vec![scored("A", 1.0), scored("B", f64::NAN), scored("C", 3.0)];
        assign_temperatures(&mut carriers);
        assert!(carriers.iter().all(|c| c.temperature.is_none()));
    }
}
