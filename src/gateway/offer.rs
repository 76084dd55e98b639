// Provider offer payload, limited to the fields the normalizer reads
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Number, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOffer {
    pub price: RawPrice,
    pub itineraries: Vec<RawItinerary>,
    #[serde(default, deserialize_with = "lenient_pricings")]
    pub traveler_pricings: Vec<TravelerPricing>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrice {
    #[serde(deserialize_with = "amount")]
    pub grand_total: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItinerary {
    #[serde(default)]
    pub duration: Option<String>,
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSegment {
    pub carrier_code: String,
    pub number: String,
    pub departure: RawEndpoint,
    pub arrival: RawEndpoint,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEndpoint {
    pub iata_code: String,
    /// Provider timestamp, kept exactly as sent.
    pub at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerPricing {
    #[serde(default)]
    pub fare_details_by_segment: Vec<FareDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareDetail {
    #[serde(default)]
    pub included_checked_bags: Option<CheckedBags>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedBags {
    #[serde(default)]
    pub quantity: Option<Number>,
    #[serde(default)]
    pub weight: Option<Number>,
    #[serde(default)]
    pub weight_unit: Option<String>,
}

impl CheckedBags {
    /// "Checked x2" or "Checked 23KG"; quantity wins when both are present.
    pub fn describe(&self) -> Option<String> {
        if let Some(quantity) = &self.quantity {
            return Some(format!("Checked x{}", quantity));
        }
        match (&self.weight, self.weight_unit.as_deref()) {
            (Some(weight), Some(unit)) => Some(format!("Checked {}{}", weight, unit)),
            _ => None,
        }
    }
}

/// Baggage data is advisory: entries that do not fit the expected shape are
/// dropped instead of failing the offer.
fn lenient_pricings<'de, D>(deserializer: D) -> Result<Vec<TravelerPricing>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let entries = match value {
        Value::Array(entries) => entries,
        _ => return Ok(Vec::new()),
    };
    Ok(entries
        .iter()
        .map(|entry| {
            let details = entry
                .get("fareDetailsBySegment")
                .and_then(Value::as_array)
                .map(|details| {
                    details
                        .iter()
                        .map(|detail| FareDetail {
                            included_checked_bags: detail
                                .get("includedCheckedBags")
                                .and_then(|bags| CheckedBags::deserialize(bags).ok()),
                        })
                        .collect()
                })
                .unwrap_or_default();
            TravelerPricing {
                fare_details_by_segment: details,
            }
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(f64),
    Text(String),
}

/// Provider totals arrive as decimal strings; plain numbers are accepted too.
fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Amount::deserialize(deserializer)? {
        Amount::Number(value) => Ok(value),
        Amount::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid amount '{}': {}", text, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_and_numeric_totals() {
        let text: RawPrice =
            serde_json::from_value(json!({ "grandTotal": "123400.00", "currency": "KRW" })).unwrap();
        assert_eq!(text.grand_total, 123400.0);

        let number: RawPrice =
            serde_json::from_value(json!({ "grandTotal": 99, "currency": "KRW" })).unwrap();
        assert_eq!(number.grand_total, 99.0);
    }

    #[test]
    fn rejects_non_numeric_total() {
        let result: Result<RawPrice, _> =
            serde_json::from_value(json!({ "grandTotal": "free", "currency": "KRW" }));
        assert!(result.is_err());
    }

    #[test]
    fn describes_checked_bags() {
        let by_count = CheckedBags {
            quantity: Some(1.into()),
            ..Default::default()
        };
        assert_eq!(by_count.describe().as_deref(), Some("Checked x1"));

        let by_weight = CheckedBags {
            weight: Some(23.into()),
            weight_unit: Some("KG".into()),
            ..Default::default()
        };
        assert_eq!(by_weight.describe().as_deref(), Some("Checked 23KG"));

        let weight_without_unit = CheckedBags {
            weight: Some(23.into()),
            ..Default::default()
        };
        assert_eq!(weight_without_unit.describe(), None);
    }

    #[test]
    fn fractional_weight_is_described_as_sent() {
        let bags: CheckedBags =
            serde_json::from_value(json!({ "weight": 15.5, "weightUnit": "KG" })).unwrap();
        assert_eq!(bags.describe().as_deref(), Some("Checked 15.5KG"));
    }

    #[test]
    fn unexpected_baggage_shapes_do_not_fail_the_offer() {
        let offer: RawOffer = serde_json::from_value(json!({
            "price": { "grandTotal": "1000", "currency": "KRW" },
            "itineraries": [],
            "travelerPricings": [
                { "fareDetailsBySegment": [
                    { "includedCheckedBags": { "quantity": "two" } },
                    { "includedCheckedBags": { "weight": 20, "weightUnit": "KG" } }
                ] },
                { "fareDetailsBySegment": "none" },
                "garbage"
            ]
        }))
        .unwrap();

        assert_eq!(offer.traveler_pricings.len(), 3);
        let first = &offer.traveler_pricings[0].fare_details_by_segment;
        assert!(first[0].included_checked_bags.is_none());
        assert_eq!(
            first[1].included_checked_bags.as_ref().and_then(CheckedBags::describe).as_deref(),
            Some("Checked 20KG")
        );
        assert!(offer.traveler_pricings[1].fare_details_by_segment.is_empty());
    }

    #[test]
    fn non_array_pricings_are_ignored() {
        let offer: RawOffer = serde_json::from_value(json!({
            "price": { "grandTotal": "1000", "currency": "KRW" },
            "itineraries": [],
            "travelerPricings": { "unexpected": true }
        }))
        .unwrap();
        assert!(offer.traveler_pricings.is_empty());
    }
}
