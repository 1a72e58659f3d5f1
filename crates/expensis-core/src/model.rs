//! Derived data produced by interpreting model output.
//!
//! Nothing here is authoritative. Each type has a lenient `from_value`
//! constructor that returns `None` for entries the model got wrong, so a bad
//! entry is dropped instead of failing the request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::{coerce_amount, text_of};
use crate::stats::Statistics;
use crate::Transaction;

/// Category assignment for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub transaction_index: usize,
    pub category: String,
    pub subcategory: String,
    /// Model confidence, clamped to `[0, 1]`.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Yearly,
    Weekly,
}

/// A recurring payment detected by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub name: String,
    pub amount: f64,
    pub frequency: Frequency,
    pub last_payment: String,
    pub transaction_indices: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastMonth {
    pub total: f64,
    pub by_category: BTreeMap<String, f64>,
}

/// Three-month spending forecast. Every part is optional; a forecast the
/// model failed to produce serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_month: Option<ForecastMonth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month2: Option<ForecastMonth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month3: Option<ForecastMonth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Saving,
    Optimization,
    Warning,
    Tip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub potential_savings: Option<f64>,
}

/// Everything `/analyze` returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub statement: Vec<Transaction>,
    pub classifications: Vec<Classification>,
    pub subscriptions: Vec<SubscriptionRecord>,
    pub forecast: Forecast,
    pub recommendations: Vec<Recommendation>,
    pub statistics: Statistics,
    /// Derived fields that degraded to empty because the reply was unusable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

fn get_any<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn index_of(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                return usize::try_from(i).ok();
            }
            let f = n.as_f64()?;
            (f >= 0.0 && f.fract() == 0.0).then_some(f as usize)
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty_text(value: Option<&Value>) -> Option<String> {
    let text = text_of(value?);
    (!text.is_empty()).then_some(text)
}

impl Classification {
    /// Returns `None` for entries without a category or whose index is
    /// outside `0..statement_len`.
    pub fn from_value(value: &Value, statement_len: usize) -> Option<Self> {
        let map = value.as_object()?;
        let index = index_of(get_any(map, &["transactionIndex", "transaction_index", "index"])?)?;
        if index >= statement_len {
            return None;
        }
        let category = non_empty_text(map.get("category"))?;
        let subcategory = map.get("subcategory").map(text_of).unwrap_or_default();
        let confidence = map
            .get("confidence")
            .map(coerce_amount)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        Some(Self {
            transaction_index: index,
            category,
            subcategory,
            confidence,
        })
    }
}

impl Frequency {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "monthly" | "month" | "месячная" | "ежемесячная" | "ежемесячно" => {
                Some(Frequency::Monthly)
            }
            "yearly" | "annual" | "annually" | "годовая" | "ежегодная" | "ежегодно" => {
                Some(Frequency::Yearly)
            }
            "weekly" | "week" | "недельная" | "еженедельная" | "еженедельно" => {
                Some(Frequency::Weekly)
            }
            _ => None,
        }
    }

    /// Payments per year.
    pub fn per_year(&self) -> f64 {
        match self {
            Frequency::Monthly => 12.0,
            Frequency::Yearly => 1.0,
            Frequency::Weekly => 52.0,
        }
    }
}

impl SubscriptionRecord {
    /// Drops records without a name or with an unknown frequency; indices
    /// outside `0..statement_len` are removed from the record.
    pub fn from_value(value: &Value, statement_len: usize) -> Option<Self> {
        let map = value.as_object()?;
        let name = non_empty_text(map.get("name"))?;
        let frequency = Frequency::parse(&text_of(map.get("frequency")?))?;
        let amount = map.get("amount").map(coerce_amount).unwrap_or(0.0);
        let last_payment = get_any(map, &["lastPayment", "last_payment"])
            .map(text_of)
            .unwrap_or_default();
        let transaction_indices = get_any(map, &["transactionIndices", "transaction_indices"])
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(index_of)
                    .filter(|i| *i < statement_len)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            name,
            amount,
            frequency,
            last_payment,
            transaction_indices,
        })
    }

    /// Yearly cost of the subscription, by absolute amount.
    pub fn annual_cost(&self) -> f64 {
        self.amount.abs() * self.frequency.per_year()
    }
}

impl ForecastMonth {
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let total = map.get("total").map(coerce_amount).unwrap_or(0.0);
        let by_category = get_any(map, &["byCategory", "by_category"])
            .and_then(Value::as_object)
            .map(|cats| {
                cats.iter()
                    .map(|(name, amount)| (name.clone(), coerce_amount(amount)))
                    .collect()
            })
            .unwrap_or_default();
        Some(Self { total, by_category })
    }
}

impl Forecast {
    pub fn from_map(map: &Map<String, Value>) -> Self {
        let month = |keys: &[&str]| get_any(map, keys).and_then(ForecastMonth::from_value);
        Self {
            next_month: month(&["nextMonth", "next_month", "month1"]),
            month2: month(&["month2"]),
            month3: month(&["month3"]),
            trends: non_empty_text(map.get("trends")),
            confidence: map
                .get("confidence")
                .filter(|v| !v.is_null())
                .map(|v| coerce_amount(v).clamp(0.0, 1.0)),
        }
    }

    /// The three forecast months in order, `None` where the model gave nothing.
    pub fn months(&self) -> [Option<&ForecastMonth>; 3] {
        [
            self.next_month.as_ref(),
            self.month2.as_ref(),
            self.month3.as_ref(),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self == &Forecast::default()
    }
}

impl RecommendationType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "saving" | "savings" | "экономия" => Some(RecommendationType::Saving),
            "optimization" | "optimisation" | "оптимизация" => {
                Some(RecommendationType::Optimization)
            }
            "warning" | "предупреждение" => Some(RecommendationType::Warning),
            "tip" | "advice" | "совет" => Some(RecommendationType::Tip),
            _ => None,
        }
    }
}

impl Priority {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "high" | "высокая" | "высокий" => Some(Priority::High),
            "medium" | "средняя" | "средний" => Some(Priority::Medium),
            "low" | "низкая" | "низкий" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl Recommendation {
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let kind = RecommendationType::parse(&text_of(map.get("type")?))?;
        let priority = Priority::parse(&text_of(map.get("priority")?))?;
        let title = non_empty_text(map.get("title"))?;
        let description = map.get("description").map(text_of).unwrap_or_default();
        let potential_savings = get_any(map, &["potentialSavings", "potential_savings"])
            .map(coerce_amount);

        Some(Self {
            kind,
            priority,
            title,
            description,
            potential_savings,
        })
    }
}

/// Stable sort, highest priority first.
pub fn sort_by_priority(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
}

pub fn parse_classifications(items: &[Value], statement_len: usize) -> Vec<Classification> {
    keep_valid("classification", items, |v| {
        Classification::from_value(v, statement_len)
    })
}

pub fn parse_subscriptions(items: &[Value], statement_len: usize) -> Vec<SubscriptionRecord> {
    keep_valid("subscription", items, |v| {
        SubscriptionRecord::from_value(v, statement_len)
    })
}

pub fn parse_recommendations(items: &[Value]) -> Vec<Recommendation> {
    keep_valid("recommendation", items, Recommendation::from_value)
}

fn keep_valid<T>(what: &str, items: &[Value], parse: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    let kept: Vec<T> = items.iter().filter_map(parse).collect();
    let dropped = items.len() - kept.len();
    if dropped > 0 {
        tracing::debug!(kind = what, dropped, kept = kept.len(), "discarded malformed entries");
    }
    kept
}
