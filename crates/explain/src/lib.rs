//! Explanation generation for carrier recommendations.
//!
//! Converts a scored carrier into human-readable explanations suitable for
//! display to the sales team and in CLI output.

use freightlead_model::{MatchTier, ScoredCarrier};
use serde::{Deserialize, Serialize};

/// A structured explanation for one component of a carrier's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation (1-2 sentences)
    pub detail: String,

    /// Points contributed to the composite score
    pub points: f64,

    /// Best achievable points for this component
    pub max_points: f64,
}

/// Generate one explanation per score component of a carrier.
pub fn explain_carrier(carrier: &ScoredCarrier) -> Vec<Explanation> {
    let record = &carrier.record;
    let samples = record.request_count;

    let transport = match record.avg_delivery_days {
        Some(days) => Explanation {
            summary: format!("Delivers in {:.1} days on average", days),
            detail: format!(
                "Speed is scored against the slowest carrier on this route and \
                 weighted by {} past request(s).",
                samples
            ),
            points: carrier.transport_score,
            max_points: 5.0,
        },
        None => Explanation {
            summary: "No delivery time history".to_string(),
            detail: "Without recorded delivery times this carrier earns no speed points.".to_string(),
            points: 0.0,
            max_points: 5.0,
        },
    };

    let reliability = match (record.on_time, record.late_deliveries) {
        (Some(on_time), Some(late)) if on_time + late > 0.0 => Explanation {
            summary: format!("{:.0}% on time", on_time / (on_time + late) * 100.0),
            detail: format!(
                "{:.0} on-time and {:.0} late deliveries; short histories are discounted.",
                on_time, late
            ),
            points: carrier.reliability_score,
            max_points: 5.0,
        },
        _ => Explanation {
            summary: "No delivery outcome history".to_string(),
            detail: "Neither on-time nor late deliveries are recorded for this carrier.".to_string(),
            points: 0.0,
            max_points: 5.0,
        },
    };

    let cost = match record.estimated_amount {
        Some(amount) => Explanation {
            summary: format!("Estimated at ${:.2}", amount),
            detail: "Cost is scored against the most expensive carrier on this route.".to_string(),
            points: carrier.cost_score,
            max_points: 10.0,
        },
        None => Explanation {
            summary: "No cost estimate".to_string(),
            detail: "Without an estimated amount this carrier earns no cost points.".to_string(),
            points: 0.0,
            max_points: 10.0,
        },
    };

    let tier_points = carrier.composite_score
        - carrier.transport_score
        - carrier.reliability_score
        - carrier.cost_score;
    let tier = match carrier.match_tier {
        MatchTier::CityMatch => Explanation {
            summary: "Serves this exact city pair".to_string(),
            detail: format!(
                "Has history from {} to {}.",
                record.pickup_city, record.destination_city
            ),
            points: tier_points,
            max_points: tier_points.max(0.0),
        },
        MatchTier::StateMatch => Explanation {
            summary: "Serves this province pair".to_string(),
            detail: format!(
                "No history on the requested cities; figures are averaged over its \
                 {} to {} routes.",
                record.pickup_province, record.destination_province
            ),
            points: tier_points,
            max_points: 0.0,
        },
    };

    vec![transport, reliability, cost, tier]
}

/// One-line summary of a carrier recommendation.
pub fn summarize_lead(carrier: &ScoredCarrier) -> String {
    let level = carrier
        .temperature
        .map(|t| t.label().to_uppercase())
        .unwrap_or_else(|| "UNRATED".to_string());

    format!(
        "{}: {}, score {:.2}",
        level,
        carrier.match_tier.label(),
        carrier.composite_score
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightlead_model::{CarrierRecord, LeadTemperature};

    fn carrier(tier: MatchTier, temperature: Option<LeadTemperature>) -> ScoredCarrier {
        let bonus = if tier == MatchTier::CityMatch { 5.0 } else { -5.0 };
        ScoredCarrier {
            record: CarrierRecord::new("Acme", "Toronto", "Vancouver")
                .with_provinces("ON", "BC")
                .with_delivery_days(3.0)
                .with_deliveries(8.0, 2.0)
                .with_request_count(15),
            match_tier: tier,
            transport_score: 5.0,
            reliability_score: 4.0,
            cost_score: 0.0,
            composite_score: 9.0 + bonus,
            temperature,
        }
    }

    #[test]
    fn test_explain_components() {
        let explanations = explain_carrier(&carrier(MatchTier::CityMatch, None));
        assert_eq!(explanations.len(), 4);
        assert!(explanations[1].summary.contains("80% on time"));
        assert_eq!(explanations[2].summary, "No cost estimate");
        assert_eq!(explanations[3].points, 5.0);
    }

    #[test]
    fn test_state_match_penalty_explained() {
        let explanations = explain_carrier(&carrier(MatchTier::StateMatch, None));
        assert_eq!(explanations[3].points, -5.0);
        assert!(explanations[3].detail.contains("ON to BC"));
    }

    #[test]
    fn test_summarize_lead() {
        let hot = carrier(MatchTier::CityMatch, Some(LeadTemperature::VeryHot));
        assert_eq!(summarize_lead(&hot), "VERY HOT: City Match, score 14.00");

        let unrated = carrier(MatchTier::StateMatch, None);
        assert!(summarize_lead(&unrated).starts_with("UNRATED"));
    }
}
