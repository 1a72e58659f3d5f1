//! End-to-end runs of extraction followed by analysis.
//!
//! Every backend is an in-memory mock, so no PDF library, OCR binary or
//! network endpoint is involved.

use std::sync::Arc;
use std::time::Duration;

use expensis_core::backend::mock::{MockOcr, MockPdfBackend};
use expensis_core::llm::mock::MockCompletion;
use expensis_core::{Analyzer, CompletionClient, ExtractionMethod, StatementExtractor};

const EXTRACTED: &str = r#"```json
[
  {"дата": "2024-01-05", "сумма": "-999", "операция": "Оплата", "детали": "Netflix"},
  {"дата": "2024-01-10", "сумма": "120 000,50", "операция": "Поступление", "детали": "Зарплата"},
  {"дата": "2024-01-12", "сумма": -2500, "операция": "Покупка", "детали": "Перекрёсток"},
  {"операция": "Мусор", "детали": "без даты"}
]
```"#;

fn scripted(delay: Option<Duration>) -> MockCompletion {
    let mock = MockCompletion::new("[]")
        .when("Извлеки все транзакции", EXTRACTED)
        .when(
            "Классифицируй",
            r#"[{"transactionIndex": 0, "category": "Подписки", "subcategory": "Видео", "confidence": 0.9},
                {"transactionIndex": 2, "category": "Продукты", "subcategory": "Супермаркет", "confidence": "0.8"}]"#,
        )
        .when(
            "Найди подписки",
            r#"[{"name": "Netflix", "amount": 999, "frequency": "месячная", "lastPayment": "2024-01-05", "transactionIndices": [0, 42]}]"#,
        )
        .when(
            "Спрогнозируй",
            r#"Прогноз: {"nextMonth": {"total": 3500}, "month2": {"total": 3600}, "month3": {"total": 3700}, "confidence": 1.7}"#,
        )
        .when(
            "рекомендации",
            r#"[{"type": "оптимизация", "priority": "средняя", "title": "Пересмотрите подписки", "description": "", "potentialSavings": null}]"#,
        );
    match delay {
        Some(d) => mock.with_delay(d),
        None => mock,
    }
}

#[tokio::test]
async fn scanned_statement_through_both_pipelines() {
    let llm: Arc<dyn CompletionClient> = Arc::new(scripted(None));
    let extractor = StatementExtractor::new(
        Arc::new(MockPdfBackend::scanned(7)),
        Arc::new(MockOcr::new("05.01 Netflix -999")),
        llm.clone(),
    );

    let extracted = extractor.extract(b"%PDF-1.4".to_vec()).await.unwrap();
    assert_eq!(extracted.method, ExtractionMethod::Ocr);
    assert_eq!(extracted.transactions.len(), 3);
    assert_eq!(extracted.transactions[1].amount, 120000.5);

    let result = Analyzer::new(llm)
        .analyze_transactions(extracted.transactions)
        .await
        .unwrap();

    assert_eq!(result.classifications.len(), 2);
    assert_eq!(result.subscriptions[0].transaction_indices, vec![0]);
    assert_eq!(result.subscriptions[0].annual_cost(), 999.0 * 12.0);
    assert_eq!(result.forecast.confidence, Some(1.0));
    assert_eq!(result.forecast.months().iter().flatten().count(), 3);
    assert_eq!(result.recommendations.len(), 1);

    let stats = &result.statistics;
    assert_eq!(stats.total_transactions, 3);
    assert_eq!(stats.total_income, 120000.5);
    assert_eq!(stats.total_expenses, 3499.0);
    assert_eq!(stats.categories["Подписки"], 999.0);
    assert_eq!(stats.categories["Продукты"], 2500.0);
    assert!((stats.net() - (120000.5 - 3499.0)).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn independent_analysis_calls_overlap() {
    let mock = Arc::new(scripted(Some(Duration::from_secs(10))));
    let analyzer = Analyzer::new(mock.clone());
    let statement = serde_json::json!([
        {"date": "2024-01-05", "amount": -999, "operation": "Payment", "details": "Netflix"}
    ]);
    let records = expensis_core::validate_statement(&statement).unwrap();

    let started = tokio::time::Instant::now();
    analyzer.analyze(records).await.unwrap();

    // Three concurrent calls then one dependent call: two delays, not four.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(20));
    assert!(elapsed < Duration::from_secs(30));
    assert_eq!(mock.call_count(), 4);
}
