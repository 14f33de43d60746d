//! Filter criteria consumed by the query builder
//!
//! Filters arrive from API clients as JSON:
//!
//! ```json
//! { "type": "list", "conjunction": "or", "filters": [
//!     { "type": "single", "condition": "eq", "value": "open" },
//!     { "type": "single", "condition": "isNull" }
//! ] }
//! ```

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FilterQlError;
use crate::query::types::FieldValue;

/// Stored value for a null entity reference
pub const NULL_ID: &str = "[NULL_ID]";

/// Comparison operator of a single-value filter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Condition {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    IsNull,
    NotNull,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Gt => "gt",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Le => "le",
            Condition::IsNull => "isNull",
            Condition::NotNull => "notNull",
        }
    }

    /// Whether the condition compares against a value
    pub fn takes_value(&self) -> bool {
        !matches!(self, Condition::IsNull | Condition::NotNull)
    }
}

impl FromStr for Condition {
    type Err = FilterQlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Condition::Eq),
            "ne" => Ok(Condition::Ne),
            "gt" => Ok(Condition::Gt),
            "ge" => Ok(Condition::Ge),
            "lt" => Ok(Condition::Lt),
            "le" => Ok(Condition::Le),
            "isNull" => Ok(Condition::IsNull),
            "notNull" => Ok(Condition::NotNull),
            other => Err(FilterQlError::UnsupportedCondition(other.to_string())),
        }
    }
}

impl TryFrom<String> for Condition {
    type Error = FilterQlError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the filters of a group are combined
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "and",
            Conjunction::Or => "or",
        }
    }
}

impl FromStr for Conjunction {
    type Err = FilterQlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "and" => Ok(Conjunction::And),
            "or" => Ok(Conjunction::Or),
            other => Err(FilterQlError::IllegalConjunction(other.to_string())),
        }
    }
}

impl TryFrom<String> for Conjunction {
    type Error = FilterQlError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Conjunction> for String {
    fn from(c: Conjunction) -> Self {
        c.as_str().to_string()
    }
}

/// Compare a field against one value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SingleValueFilter {
    pub condition: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,
}

impl SingleValueFilter {
    pub fn new(condition: Condition, value: impl Into<FieldValue>) -> Self {
        Self {
            condition,
            value: Some(value.into()),
        }
    }

    pub fn eq(value: impl Into<FieldValue>) -> Self {
        Self::new(Condition::Eq, value)
    }

    pub fn ne(value: impl Into<FieldValue>) -> Self {
        Self::new(Condition::Ne, value)
    }

    pub fn is_null() -> Self {
        Self {
            condition: Condition::IsNull,
            value: None,
        }
    }

    pub fn not_null() -> Self {
        Self {
            condition: Condition::NotNull,
            value: None,
        }
    }
}

/// Numeric range, inclusive on both ends
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRangeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<FieldValue>,
}

impl ValueRangeFilter {
    pub fn new(from: Option<FieldValue>, to: Option<FieldValue>) -> Self {
        Self { from, to }
    }

    pub fn between(from: impl Into<FieldValue>, to: impl Into<FieldValue>) -> Self {
        Self::new(Some(from.into()), Some(to.into()))
    }
}

/// Named calendar period a date range can be expressed as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePeriod {
    Today,
    CurrentWeek,
    CurrentMonth,
    CurrentYear,
    /// The last `n` days, today included
    LastDays(u32),
}

/// Calendar date range; the computed upper bound is exclusive
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRangeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<DatePeriod>,
}

impl DateRangeFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            period: None,
        }
    }

    pub fn of_period(period: DatePeriod) -> Self {
        Self {
            period: Some(period),
            ..Default::default()
        }
    }

    /// First and last day covered, relative to `today` for periods
    fn days(&self, today: NaiveDate) -> Result<(Option<NaiveDate>, Option<NaiveDate>), FilterQlError> {
        let range = match self.period {
            None => (self.from, self.to),
            Some(DatePeriod::Today) => (Some(today), Some(today)),
            Some(DatePeriod::CurrentWeek) => {
                let start = shift(today, -(today.weekday().num_days_from_monday() as i64))?;
                (Some(start), Some(shift(start, 6)?))
            }
            Some(DatePeriod::CurrentMonth) => {
                let start = today.with_day(1).unwrap_or(today);
                let next = if start.month() == 12 {
                    NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
                };
                let last = match next {
                    Some(next) => Some(shift(next, -1)?),
                    None => None,
                };
                (Some(start), last)
            }
            Some(DatePeriod::CurrentYear) => (
                NaiveDate::from_ymd_opt(today.year(), 1, 1),
                NaiveDate::from_ymd_opt(today.year(), 12, 31),
            ),
            Some(DatePeriod::LastDays(n)) => {
                (Some(shift(today, -(n.saturating_sub(1) as i64))?), Some(today))
            }
        };
        Ok(range)
    }

    /// Inclusive lower bound as of `today`
    pub fn calculate_from_at(&self, today: NaiveDate) -> Result<Option<NaiveDate>, FilterQlError> {
        Ok(self.days(today)?.0)
    }

    /// Exclusive upper bound (the day after the last day) as of `today`
    pub fn calculate_to_at(&self, today: NaiveDate) -> Result<Option<NaiveDate>, FilterQlError> {
        match self.days(today)?.1 {
            Some(last) => Ok(Some(shift(last, 1)?)),
            None => Ok(None),
        }
    }

    pub fn calculate_from(&self) -> Result<Option<NaiveDate>, FilterQlError> {
        self.calculate_from_at(Utc::now().date_naive())
    }

    pub fn calculate_to(&self) -> Result<Option<NaiveDate>, FilterQlError> {
        self.calculate_to_at(Utc::now().date_naive())
    }
}

/// `day` moved by `days`; fails outside the supported calendar
fn shift(day: NaiveDate, days: i64) -> Result<NaiveDate, FilterQlError> {
    day.checked_add_signed(Duration::days(days)).ok_or_else(|| {
        FilterQlError::InvalidQuery(format!("date {} moved by {} days is out of range", day, days))
    })
}

/// Equality against a referenced entity, stored in the index by its id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub condition: Condition,
    /// Encoded identifier of the referenced entity; `None` is a null reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EntityFilter {
    pub fn new(condition: Condition, id: Option<String>) -> Self {
        Self { condition, id }
    }

    /// The single-value filter this reference is matched with
    pub fn as_single_value(&self) -> SingleValueFilter {
        let value = if self.condition.takes_value() {
            Some(FieldValue::String(
                self.id.clone().unwrap_or_else(|| NULL_ID.to_string()),
            ))
        } else {
            None
        };
        SingleValueFilter {
            condition: self.condition,
            value,
        }
    }
}

/// Group of filters applied to the same field
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
}

impl ListFilter {
    pub fn new(conjunction: Conjunction, filters: Vec<QueryFilter>) -> Self {
        Self {
            conjunction,
            filters,
        }
    }

    pub fn and(filters: Vec<QueryFilter>) -> Self {
        Self::new(Conjunction::And, filters)
    }

    pub fn or(filters: Vec<QueryFilter>) -> Self {
        Self::new(Conjunction::Or, filters)
    }
}

/// Any filter the builder can dispatch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryFilter {
    Single(SingleValueFilter),
    ValueRange(ValueRangeFilter),
    DateRange(DateRangeFilter),
    List(ListFilter),
    Entity(EntityFilter),
}

impl From<SingleValueFilter> for QueryFilter {
    fn from(f: SingleValueFilter) -> Self {
        QueryFilter::Single(f)
    }
}

impl From<ValueRangeFilter> for QueryFilter {
    fn from(f: ValueRangeFilter) -> Self {
        QueryFilter::ValueRange(f)
    }
}

impl From<DateRangeFilter> for QueryFilter {
    fn from(f: DateRangeFilter) -> Self {
        QueryFilter::DateRange(f)
    }
}

impl From<ListFilter> for QueryFilter {
    fn from(f: ListFilter) -> Self {
        QueryFilter::List(f)
    }
}

impl From<EntityFilter> for QueryFilter {
    fn from(f: EntityFilter) -> Self {
        QueryFilter::Entity(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_condition_parsing() {
        assert_eq!("isNull".parse::<Condition>().unwrap(), Condition::IsNull);
        let err = "like".parse::<Condition>().unwrap_err();
        assert!(matches!(err, FilterQlError::UnsupportedCondition(ref op) if op == "like"));
    }

    #[test]
    fn test_conjunction_parsing() {
        assert_eq!("or".parse::<Conjunction>().unwrap(), Conjunction::Or);
        assert!(matches!(
            "xor".parse::<Conjunction>(),
            Err(FilterQlError::IllegalConjunction(_))
        ));
    }

    #[test]
    fn test_filter_json() {
        let filter: QueryFilter = serde_json::from_value(json!({
            "type": "list",
            "conjunction": "or",
            "filters": [
                { "type": "single", "condition": "eq", "value": "open" },
                { "type": "single", "condition": "isNull" },
                { "type": "valueRange", "from": 1, "to": 5 }
            ]
        }))
        .unwrap();

        match filter {
            QueryFilter::List(list) => {
                assert_eq!(list.conjunction, Conjunction::Or);
                assert_eq!(list.filters.len(), 3);
                assert_eq!(
                    list.filters[0],
                    QueryFilter::Single(SingleValueFilter::eq("open"))
                );
            }
            other => panic!("unexpected filter: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_condition_in_json_names_operator() {
        let err = serde_json::from_value::<QueryFilter>(json!({
            "type": "single", "condition": "like", "value": "x"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("like"));
    }

    #[test]
    fn test_date_range_upper_bound_is_exclusive() {
        let filter = DateRangeFilter::between(date(2024, 1, 1), date(2024, 1, 31));
        let today = date(2030, 6, 1);
        assert_eq!(filter.calculate_from_at(today).unwrap(), Some(date(2024, 1, 1)));
        assert_eq!(filter.calculate_to_at(today).unwrap(), Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_date_periods() {
        let today = date(2024, 2, 14); // Wednesday
        let week = DateRangeFilter::of_period(DatePeriod::CurrentWeek);
        assert_eq!(week.calculate_from_at(today).unwrap(), Some(date(2024, 2, 12)));
        assert_eq!(week.calculate_to_at(today).unwrap(), Some(date(2024, 2, 19)));

        let month = DateRangeFilter::of_period(DatePeriod::CurrentMonth);
        assert_eq!(month.calculate_from_at(today).unwrap(), Some(date(2024, 2, 1)));
        assert_eq!(month.calculate_to_at(today).unwrap(), Some(date(2024, 3, 1)));

        let last = DateRangeFilter::of_period(DatePeriod::LastDays(7));
        assert_eq!(last.calculate_from_at(today).unwrap(), Some(date(2024, 2, 8)));
        assert_eq!(last.calculate_to_at(today).unwrap(), Some(date(2024, 2, 15)));
    }

    #[test]
    fn test_out_of_range_periods_are_rejected() {
        let today = date(2024, 2, 14);
        let ancient = DateRangeFilter::of_period(DatePeriod::LastDays(u32::MAX));
        assert!(matches!(
            ancient.calculate_from_at(today),
            Err(FilterQlError::InvalidQuery(_))
        ));

        let open_end = DateRangeFilter {
            to: Some(NaiveDate::MAX),
            ..Default::default()
        };
        assert!(matches!(
            open_end.calculate_to_at(today),
            Err(FilterQlError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_entity_filter_encoding() {
        let f = EntityFilter::new(Condition::Eq, Some("42".to_string()));
        assert_eq!(f.as_single_value(), SingleValueFilter::eq("42"));

        let null_ref = EntityFilter::new(Condition::Eq, None);
        assert_eq!(null_ref.as_single_value(), SingleValueFilter::eq(NULL_ID));
    }
}
