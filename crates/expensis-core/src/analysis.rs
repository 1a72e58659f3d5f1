//! Statement → classifications, subscriptions, forecast, recommendations.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::fields::{self, FieldConcept};
use crate::interpret::{self, InterpretError};
use crate::llm::{ChatMessage, CompletionClient, CompletionError};
use crate::model::{self, AnalysisResult, Forecast};
use crate::prompts::{
    self, CLASSIFICATION_TEMPERATURE, FORECAST_TEMPERATURE, RECOMMENDATIONS_TEMPERATURE,
    SUBSCRIPTIONS_TEMPERATURE,
};
use crate::{Statistics, Transaction};

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Check that `statement` is a non-empty array whose first record exposes a
/// date, amount, operation and details field. Only the first record is
/// probed; later records are normalized leniently.
pub fn validate_statement(statement: &Value) -> Result<&Vec<Value>, AnalysisError> {
    let records = statement
        .as_array()
        .ok_or_else(|| AnalysisError::Validation("statement must be an array".into()))?;

    let first = records
        .first()
        .ok_or_else(|| AnalysisError::Validation("statement is empty".into()))?;

    let Some(first) = first.as_object() else {
        return Err(AnalysisError::Validation(
            "statement entries must be objects".into(),
        ));
    };

    let missing = missing_fields(first);
    if !missing.is_empty() {
        return Err(AnalysisError::Validation(format!(
            "statement entries must have date, amount, operation and details fields (missing: {})",
            missing.join(", ")
        )));
    }

    Ok(records)
}

fn missing_fields(record: &Map<String, Value>) -> Vec<&'static str> {
    fields::missing_concepts(record)
        .iter()
        .map(FieldConcept::name)
        .collect()
}

pub struct Analyzer {
    llm: Arc<dyn CompletionClient>,
}

impl Analyzer {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self { llm }
    }

    /// Analyze validated raw records. See [`validate_statement`].
    pub async fn analyze(&self, records: &[Value]) -> Result<AnalysisResult, AnalysisError> {
        let statement: Vec<Transaction> =
            records.iter().map(fields::transaction_from_record).collect();
        self.analyze_transactions(statement).await
    }

    /// Analyze an already-normalized statement.
    pub async fn analyze_transactions(
        &self,
        statement: Vec<Transaction>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let len = statement.len();
        let statement_json = to_prompt_json(&statement);
        tracing::info!(transactions = len, client = self.llm.name(), "starting analysis");

        let (classified, detected, forecasted) = tokio::try_join!(
            self.ask(
                prompts::classification(&statement_json),
                CLASSIFICATION_TEMPERATURE
            ),
            self.ask(
                prompts::subscriptions(&statement_json),
                SUBSCRIPTIONS_TEMPERATURE
            ),
            self.ask(prompts::forecast(&statement_json), FORECAST_TEMPERATURE),
        )?;

        let mut warnings = Vec::new();

        let classifications = model::parse_classifications(
            &degrade("classifications", interpret::json_array(&classified), &mut warnings),
            len,
        );
        let subscriptions = model::parse_subscriptions(
            &degrade("subscriptions", interpret::json_array(&detected), &mut warnings),
            len,
        );
        let forecast = Forecast::from_map(&degrade(
            "forecast",
            interpret::json_object(&forecasted),
            &mut warnings,
        ));

        let advised = self
            .ask(
                prompts::recommendations(
                    &statement_json,
                    &to_prompt_json(&classifications),
                    &to_prompt_json(&subscriptions),
                    &to_prompt_json(&forecast),
                ),
                RECOMMENDATIONS_TEMPERATURE,
            )
            .await?;
        let recommendations = model::parse_recommendations(&degrade(
            "recommendations",
            interpret::json_array(&advised),
            &mut warnings,
        ));

        let statistics = Statistics::compute(&statement, &classifications);

        tracing::info!(
            classifications = classifications.len(),
            subscriptions = subscriptions.len(),
            recommendations = recommendations.len(),
            forecast = !forecast.is_empty(),
            degraded = warnings.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            statement,
            classifications,
            subscriptions,
            forecast,
            recommendations,
            statistics,
            warnings,
        })
    }

    async fn ask(&self, prompt: String, temperature: f32) -> Result<String, CompletionError> {
        let messages = [ChatMessage::user(prompt)];
        self.llm.complete(&messages, temperature).await
    }
}

/// Unwrap a parsed reply, or record why `field` came back empty.
fn degrade<T: Default>(
    field: &str,
    parsed: Result<T, InterpretError>,
    warnings: &mut Vec<String>,
) -> T {
    parsed.unwrap_or_else(|e| {
        tracing::warn!(field, error = %e, "unusable model reply, field left empty");
        warnings.push(format!("{field}: {e}"));
        T::default()
    })
}

fn to_prompt_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockCompletion;
    use crate::model::{Frequency, Priority};
    use serde_json::json;

    fn example() -> Value {
        json!([
            {"дата": "2024-01-15", "сумма": -1500, "операция": "Покупка", "детали": "Супермаркет Ашан"},
            {"дата": "2024-01-17", "сумма": 50000, "операция": "Поступление", "детали": "Зарплата"}
        ])
    }

    /// Append well-formed replies for every step; rules already on `mock` win.
    fn scripted(mock: MockCompletion) -> MockCompletion {
        mock.when(
                "Классифицируй",
                r#"[{"transactionIndex": 0, "category": "Продукты", "subcategory": "Супермаркет", "confidence": 0.95},
                    {"transactionIndex": 99, "category": "Призрак", "subcategory": "", "confidence": 0.1}]"#,
            )
            .when(
                "Найди подписки",
                r#"Нашёл: [{"name": "Netflix", "amount": 999, "frequency": "monthly", "lastPayment": "2024-01-16", "transactionIndices": [0]}]"#,
            )
            .when(
                "Спрогнозируй",
                r#"{"nextMonth": {"total": 2000, "byCategory": {"Продукты": 2000}}, "trends": "стабильно", "confidence": 0.7}"#,
            )
            .when(
                "рекомендации",
                r#"[{"type": "saving", "priority": "high", "title": "Отмените Netflix", "description": "Редко используется", "potentialSavings": 999}]"#,
            )
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        assert!(validate_statement(&json!({"a": 1})).is_err());
        assert!(validate_statement(&json!([])).is_err());
        assert!(validate_statement(&json!(["строка"])).is_err());

        let err = validate_statement(&json!([{"дата": "2024-01-01", "сумма": 1}])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("operation"));
        assert!(message.contains("details"));
    }

    #[test]
    fn validation_accepts_loose_key_spellings() {
        let statement = json!([
            {"Дата операции": "2024-01-01", "Сумма": "-10", "Операция (тип)": "Оплата", "Детали платежа": "Кафе"}
        ]);
        assert_eq!(validate_statement(&statement).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn example_statement_end_to_end() {
        let llm = Arc::new(scripted(MockCompletion::new("")));
        let analyzer = Analyzer::new(llm.clone());
        let statement = example();
        let records = validate_statement(&statement).unwrap();

        let result = analyzer.analyze(records).await.unwrap();

        assert_eq!(result.statement.len(), 2);
        assert_eq!(result.statement[0].details, "Супермаркет Ашан");
        assert_eq!(result.classifications.len(), 1);
        assert_eq!(result.subscriptions[0].frequency, Frequency::Monthly);
        assert_eq!(
            result.forecast.next_month.as_ref().map(|m| m.total),
            Some(2000.0)
        );
        assert_eq!(result.recommendations[0].priority, Priority::High);
        assert_eq!(result.statistics.total_income, 50000.0);
        assert_eq!(result.statistics.total_expenses, 1500.0);
        assert_eq!(result.statistics.categories["Продукты"], 1500.0);
        assert!(result.warnings.is_empty());
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn temperatures_follow_each_task() {
        let llm = Arc::new(scripted(MockCompletion::new("")));
        let analyzer = Analyzer::new(llm.clone());
        let statement = example();
        analyzer
            .analyze(validate_statement(&statement).unwrap())
            .await
            .unwrap();

        let calls = llm.calls();
        let temperature_of = |keyword: &str| {
            calls
                .iter()
                .find(|c| c.prompt.lines().next().unwrap_or("").contains(keyword))
                .map(|c| c.temperature)
        };
        assert_eq!(temperature_of("Классифицируй"), Some(0.3));
        assert_eq!(temperature_of("Найди подписки"), Some(0.3));
        assert_eq!(temperature_of("Спрогнозируй"), Some(0.5));
        assert_eq!(temperature_of("рекомендации"), Some(0.7));
    }

    #[tokio::test]
    async fn recommendations_run_last_with_prior_results() {
        let llm = Arc::new(scripted(MockCompletion::new("")));
        let analyzer = Analyzer::new(llm.clone());
        let statement = example();
        analyzer
            .analyze(validate_statement(&statement).unwrap())
            .await
            .unwrap();

        let calls = llm.calls();
        let last = calls.last().unwrap();
        assert!(last.prompt.starts_with("Дай практические рекомендации"));
        assert!(last.prompt.contains("Netflix"));
        assert!(last.prompt.contains("стабильно"));
        assert!(last.prompt.contains("Продукты"));
    }

    #[tokio::test]
    async fn unusable_replies_degrade_with_warnings() {
        let llm = Arc::new(
            MockCompletion::new("[]")
                .when("Классифицируй", "Не могу классифицировать.")
                .when("Спрогнозируй", "прогноз: [1, 2, 3]"),
        );
        let analyzer = Analyzer::new(llm.clone());
        let statement = example();

        let result = analyzer
            .analyze(validate_statement(&statement).unwrap())
            .await
            .unwrap();

        assert!(result.classifications.is_empty());
        assert!(result.forecast.is_empty());
        assert!(result.subscriptions.is_empty());
        assert!(result.recommendations.is_empty());
        assert!(result.statistics.categories.is_empty());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].starts_with("classifications"));
        assert!(result.warnings[1].starts_with("forecast"));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["forecast"], json!({}));
    }

    #[tokio::test]
    async fn completion_failure_fails_the_request() {
        let llm = Arc::new(scripted(
            MockCompletion::new("").fail_when("Найди подписки", 502, "upstream down"),
        ));
        let analyzer = Analyzer::new(llm);
        let statement = example();

        let err = analyzer
            .analyze(validate_statement(&statement).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Completion(CompletionError::Status { status: 502, .. })
        ));
    }
}
