use crate::gateway::offer::{RawItinerary, RawOffer, RawSegment};
use crate::model::{FareQuery, NormalizeError, NormalizedFare, OfferSummary};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Parses a provider offer and checks the fields every record depends on.
pub fn parse_offer(value: &Value) -> Result<RawOffer, NormalizeError> {
    let offer = RawOffer::deserialize(value).map_err(|e| NormalizeError::MalformedOffer(e.to_string()))?;

    let price = offer.price.grand_total;
    if !price.is_finite() || price < 0.0 {
        return Err(NormalizeError::MalformedOffer(format!("invalid price {}", price)));
    }
    let route = Route::of(&offer)?;
    check_timestamp(&route.first.departure.at)?;
    check_timestamp(&route.last.arrival.at)?;
    route.stops()?;
    Ok(offer)
}

/// Accepts local provider times (`2026-11-03T09:00:00`, optional fraction) and
/// RFC 3339 times with an offset. The text itself is kept untouched.
fn check_timestamp(text: &str) -> Result<(), NormalizeError> {
    if text.parse::<NaiveDateTime>().is_ok() || DateTime::parse_from_rfc3339(text).is_ok() {
        Ok(())
    } else {
        Err(NormalizeError::MalformedOffer(format!("invalid timestamp '{}'", text)))
    }
}

/// First and last leg of the first itinerary. `parse_offer` guarantees both exist.
struct Route<'a> {
    itinerary: &'a RawItinerary,
    first: &'a RawSegment,
    last: &'a RawSegment,
}

impl<'a> Route<'a> {
    fn of(offer: &'a RawOffer) -> Result<Self, NormalizeError> {
        let itinerary = offer
            .itineraries
            .first()
            .ok_or_else(|| NormalizeError::MalformedOffer("no itineraries".into()))?;
        match (itinerary.segments.first(), itinerary.segments.last()) {
            (Some(first), Some(last)) => Ok(Self { itinerary, first, last }),
            _ => Err(NormalizeError::MalformedOffer("itinerary has no segments".into())),
        }
    }

    fn stops(&self) -> Result<u32, NormalizeError> {
        let legs = self.itinerary.segments.len();
        u32::try_from(legs.saturating_sub(1))
            .map_err(|_| NormalizeError::MalformedOffer(format!("{} segments", legs)))
    }

    fn flight_no(&self) -> String {
        format!("{}{}", self.first.carrier_code, self.first.number)
    }

    fn duration(&self) -> String {
        self.itinerary.duration.clone().unwrap_or_default()
    }
}

/// Carrier of the first segment, used as the grouping key.
pub fn carrier_code(offer: &RawOffer) -> Result<&str, NormalizeError> {
    Route::of(offer).map(|route| route.first.carrier_code.as_str())
}

pub fn normalize_fare(
    offer: &RawOffer,
    query: &FareQuery,
    collected_at: DateTime<Utc>,
) -> Result<NormalizedFare, NormalizeError> {
    let route = Route::of(offer)?;

    Ok(NormalizedFare {
        collected_at,
        travel_date: query.travel_date,
        origin: query.origin.clone(),
        destination: query.destination.clone(),
        airline: route.first.carrier_code.clone(),
        flight_no: route.flight_no(),
        dep_time: route.first.departure.at.clone(),
        arr_time: route.last.arrival.at.clone(),
        stops: route.stops()?,
        duration: route.duration(),
        price: offer.price.grand_total,
        currency: offer.price.currency.clone(),
    })
}

pub fn summarize_offer(offer: &RawOffer) -> Result<OfferSummary, NormalizeError> {
    let route = Route::of(offer)?;

    Ok(OfferSummary {
        price: offer.price.grand_total,
        currency: offer.price.currency.clone(),
        dep: route.first.departure.iata_code.clone(),
        arr: route.last.arrival.iata_code.clone(),
        dep_time: route.first.departure.at.clone(),
        arr_time: route.last.arrival.at.clone(),
        airline: route.first.carrier_code.clone(),
        flight_no: route.flight_no(),
        stops: route.stops()?,
        duration: route.duration(),
        baggage: baggage_allowance(offer),
    })
}

/// First included checked-bag allowance across travelers and segments.
pub fn baggage_allowance(offer: &RawOffer) -> Option<String> {
    offer
        .traveler_pricings
        .iter()
        .flat_map(|tp| tp.fare_details_by_segment.iter())
        .filter_map(|fd| fd.included_checked_bags.as_ref())
        .find_map(|bags| bags.describe())
}


#[cfg(test)]
mod tests {
    use super::fixtures::{offer, segment};
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn query() -> FareQuery {
        FareQuery {
            origin: "ICN".into(),
            destination: "NRT".into(),
            travel_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            adults: 1,
            airline: None,
        }
    }

    #[test]
    fn normalizes_nonstop_offer() {
        let raw = parse_offer(&offer("KE", "120000.00", 1)).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap();
        let fare = normalize_fare(&raw, &query(), now).unwrap();

        assert_eq!(fare.collected_at, now);
        assert_eq!(fare.origin, "ICN");
        assert_eq!(fare.destination, "NRT");
        assert_eq!(fare.airline, "KE");
        assert_eq!(fare.flight_no, "KE101");
        assert_eq!(fare.stops, 0);
        assert_eq!(fare.dep_time, "2026-11-03T09:00:00");
        assert_eq!(fare.arr_time, "2026-11-03T11:20:00");
        assert_eq!(fare.duration, "PT2H20M");
        assert_eq!(fare.price, 120000.0);
        assert_eq!(fare.currency, "KRW");
    }

    #[test]
    fn connecting_offer_spans_first_departure_to_last_arrival() {
        let raw = parse_offer(&offer("OZ", "200000", 2)).unwrap();
        let fare = normalize_fare(&raw, &query(), Utc::now()).unwrap();

        assert_eq!(fare.stops, 1);
        assert_eq!(fare.flight_no, "OZ201");
        assert_eq!(fare.dep_time, "2026-11-03T07:00:00");
        assert_eq!(fare.arr_time, "2026-11-03T12:40:00");
    }

    #[test]
    fn only_first_itinerary_is_considered() {
        let mut value = offer("KE", "1000", 1);
        value["itineraries"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "segments": [segment("JL", "9", "NRT", "ICN", "2026-11-10T09:00:00", "2026-11-10T11:00:00")] }));
        let raw = parse_offer(&value).unwrap();
        assert_eq!(carrier_code(&raw).unwrap(), "KE");
    }

    #[test]
    fn missing_duration_becomes_empty() {
        let mut value = offer("KE", "1000", 1);
        value["itineraries"][0].as_object_mut().unwrap().remove("duration");
        let raw = parse_offer(&value).unwrap();
        assert_eq!(summarize_offer(&raw).unwrap().duration, "");
    }

    #[test]
    fn rejects_malformed_offers() {
        let mut no_price = offer("KE", "1000", 1);
        no_price.as_object_mut().unwrap().remove("price");
        assert!(matches!(parse_offer(&no_price), Err(NormalizeError::MalformedOffer(_))));

        let no_segments = offer("KE", "1000", 0);
        assert!(parse_offer(&no_segments).is_err());

        let no_itineraries = json!({ "price": { "grandTotal": "1", "currency": "KRW" }, "itineraries": [] });
        assert!(parse_offer(&no_itineraries).is_err());

        let negative = offer("KE", "-5", 1);
        assert!(parse_offer(&negative).is_err());

        let mut bad_time = offer("KE", "1000", 1);
        bad_time["itineraries"][0]["segments"][0]["departure"]["at"] = json!("soon");
        assert!(parse_offer(&bad_time).is_err());
    }

    #[test]
    fn summary_carries_airports_and_baggage() {
        let mut value = offer("OZ", "200000", 2);
        value["travelerPricings"] = json!([
            { "fareDetailsBySegment": [ { "cabin": "ECONOMY" } ] },
            { "fareDetailsBySegment": [
                { "includedCheckedBags": { "weight": 15, "weightUnit": "KG" } },
                { "includedCheckedBags": { "quantity": 2 } }
            ] }
        ]);
        let raw = parse_offer(&value).unwrap();
        let summary = summarize_offer(&raw).unwrap();

        assert_eq!(summary.dep, "ICN");
        assert_eq!(summary.arr, "NRT");
        assert_eq!(summary.flight_no, "OZ201");
        assert_eq!(summary.baggage.as_deref(), Some("Checked 15KG"));
    }

    #[test]
    fn baggage_is_omitted_when_absent() {
        let raw = parse_offer(&offer("KE", "1000", 1)).unwrap();
        assert_eq!(baggage_allowance(&raw), None);
    }

    #[test]
    fn timestamps_pass_through_unchanged() {
        let mut value = offer("KE", "1000", 2);
        value["itineraries"][0]["segments"][0]["departure"]["at"] = json!("2026-11-03T07:00:00.250");
        value["itineraries"][0]["segments"][1]["arrival"]["at"] = json!("2026-11-03T12:40:00+09:00");
        let raw = parse_offer(&value).unwrap();
        let fare = normalize_fare(&raw, &query(), Utc::now()).unwrap();

        assert_eq!(fare.dep_time, "2026-11-03T07:00:00.250");
        assert_eq!(fare.arr_time, "2026-11-03T12:40:00+09:00");
    }

    #[test]
    fn stops_count_every_extra_leg() {
        let mut value = offer("KE", "1000", 2);
        value["itineraries"][0]["segments"]
            .as_array_mut()
            .unwrap()
            .push(segment("KE", "7", "NRT", "CTS", "2026-11-03T14:00:00", "2026-11-03T15:45:00"));
        let raw = parse_offer(&value).unwrap();

        let summary = summarize_offer(&raw).unwrap();
        assert_eq!(summary.stops, 2);
        assert_eq!(summary.arr, "CTS");
        assert_eq!(summary.arr_time, "2026-11-03T15:45:00");
    }
}
