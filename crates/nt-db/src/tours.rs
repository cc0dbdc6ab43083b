//! Tour aggregations
//!
//! Both reports read through the collection, so the tour schema's base
//! filter (no secret tours) applies to them as well.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use nt_queries::{DocumentQuery, Filter, FilterOperator, FilterSet, Projection};
use serde_json::{json, Value};

use crate::collection::{Collection, StoreResult};

/// Tours rated at least this highly are counted by `tour_stats`
pub const STATS_MIN_RATING: f64 = 4.5;

#[derive(Debug, Default)]
struct DifficultyStats {
    num_tours: u64,
    num_ratings: f64,
    rating_sum: f64,
    rating_count: u64,
    price_sum: f64,
    price_count: u64,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

impl DifficultyStats {
    fn add(&mut self, tour: &serde_json::Map<String, Value>) {
        self.num_tours += 1;
        self.num_ratings += tour.get("ratingsQuantity").and_then(Value::as_f64).unwrap_or(0.0);
        if let Some(rating) = tour.get("ratingsAverage").and_then(Value::as_f64) {
            self.rating_sum += rating;
            self.rating_count += 1;
        }
        if let Some(price) = tour.get("price").and_then(Value::as_f64) {
            self.price_sum += price;
            self.price_count += 1;
            self.min_price = Some(self.min_price.map_or(price, |min| min.min(price)));
            self.max_price = Some(self.max_price.map_or(price, |max| max.max(price)));
        }
    }

    fn avg_price(&self) -> Option<f64> {
        (self.price_count > 0).then(|| self.price_sum / self.price_count as f64)
    }

    fn into_value(self, difficulty: String) -> Value {
        let avg_rating = (self.rating_count > 0).then(|| self.rating_sum / self.rating_count as f64);
        json!({
            "_id": difficulty,
            "numTours": self.num_tours,
            "numRatings": self.num_ratings,
            "avgRating": avg_rating,
            "avgPrice": self.avg_price(),
            "minPrice": self.min_price,
            "maxPrice": self.max_price,
        })
    }
}

/// Highly rated tours grouped by upper-cased difficulty, cheapest group first
pub async fn tour_stats(tours: &dyn Collection) -> StoreResult<Vec<Value>> {
    let query = DocumentQuery::find(FilterSet::new().with(Filter::new(
        "ratingsAverage",
        FilterOperator::Gte,
        STATS_MIN_RATING,
    )))
    .select(Projection::All);

    let mut groups: BTreeMap<String, DifficultyStats> = BTreeMap::new();
    for tour in tours.find(query).await? {
        let difficulty = tour
            .get("difficulty")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase();
        groups.entry(difficulty).or_default().add(&tour);
    }

    let mut stats: Vec<(Option<f64>, Value)> = groups
        .into_iter()
        .map(|(difficulty, group)| (group.avg_price(), group.into_value(difficulty)))
        .collect();
    stats.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Ok(stats.into_iter().map(|(_, value)| value).collect())
}

/// Read a start date as stored: RFC 3339, `2021-06-19,10:00`, or a bare date
pub fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d,%H:%M") {
        return Some(parsed.date());
    }
    raw.get(..10)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

/// Tour starts per month of `year`, busiest month first
pub async fn monthly_plan(tours: &dyn Collection, year: i32) -> StoreResult<Vec<Value>> {
    let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for tour in tours.find(DocumentQuery::all().select(Projection::All)).await? {
        let name = tour
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let dates = tour
            .get("startDates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for date in dates.iter().filter_map(Value::as_str).filter_map(parse_start_date) {
            if date.year() == year {
                months.entry(date.month()).or_default().push(name.clone());
            }
        }
    }

    let mut plan: Vec<(u32, Vec<String>)> = months.into_iter().collect();
    // stable: equally busy months stay in calendar order
    plan.sort_by(|(_, a), (_, b)| b.len().cmp(&a.len()));
    Ok(plan
        .into_iter()
        .map(|(month, names)| {
            let starts = names.len();
            json!({
                "numTourStarts": starts,
                "tours": names,
                "month": month,
            })
        })
        .collect())
}
