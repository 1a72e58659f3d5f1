//! Prompt builders and sampling temperatures for every model call.
//!
//! The first line of each prompt states the task; tests script the mock
//! client by matching on it.

pub const EXTRACTION_TEMPERATURE: f32 = 0.3;
pub const CLASSIFICATION_TEMPERATURE: f32 = 0.3;
pub const SUBSCRIPTIONS_TEMPERATURE: f32 = 0.3;
pub const FORECAST_TEMPERATURE: f32 = 0.5;
pub const RECOMMENDATIONS_TEMPERATURE: f32 = 0.7;

/// Characters of embedded PDF text sent for extraction.
pub const TEXT_BUDGET: usize = 10_000;
/// Characters of OCR text sent for extraction; OCR output is noisier.
pub const OCR_BUDGET: usize = 15_000;

/// First `limit` characters of `text`, with `...` appended if anything was cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

const TRANSACTION_FIELDS: &str = "\
- дата: дата транзакции в формате YYYY-MM-DD
- сумма: число (отрицательное для расходов, положительное для доходов)
- операция: тип операции
- детали: описание транзакции";

const TRANSACTION_EXAMPLE: &str = r#"[
  {"дата": "2024-01-15", "сумма": -1500, "операция": "Покупка", "детали": "Супермаркет Ашан"},
  {"дата": "2024-01-16", "сумма": -500, "операция": "Оплата", "детали": "Netflix подписка"}
]"#;

const BARE_JSON_ONLY: &str =
    "ВАЖНО: Верни ТОЛЬКО JSON массив, без дополнительного текста, объяснений или markdown форматирования.";

/// Extraction prompt for an embedded text layer.
pub fn text_extraction(source: &str) -> String {
    format!(
        "Ты финансовый аналитик. Извлеки все транзакции из текста банковской выписки.\n\n\
         Текст выписки:\n{}\n\n\
         Верни ТОЛЬКО валидный JSON массив объектов с полями:\n{}\n\n\
         Если не можешь определить дату, используй формат из текста.\n\
         Если не можешь определить сумму, используй 0.\n\n\
         Пример ответа:\n{}\n\n{}",
        truncate_chars(source, TEXT_BUDGET),
        TRANSACTION_FIELDS,
        TRANSACTION_EXAMPLE,
        BARE_JSON_ONLY,
    )
}

/// Extraction prompt for OCR output.
pub fn ocr_extraction(source: &str) -> String {
    format!(
        "Ты финансовый аналитик. Извлеки все транзакции из текста банковской выписки, распознанного OCR.\n\n\
         Текст выписки (может содержать ошибки OCR):\n{}\n\n\
         Верни ТОЛЬКО валидный JSON массив объектов с полями:\n{}\n\n\
         Текст может содержать ошибки распознавания, будь внимателен с числами и датами.\n\
         Если не можешь определить дату, используй формат из текста.\n\
         Если не можешь определить сумму, используй 0.\n\n\
         Пример ответа:\n{}\n\n{}",
        truncate_chars(source, OCR_BUDGET),
        TRANSACTION_FIELDS,
        TRANSACTION_EXAMPLE,
        BARE_JSON_ONLY,
    )
}

pub fn classification(statement_json: &str) -> String {
    format!(
        "Ты финансовый аналитик. Классифицируй каждую транзакцию выписки по категориям.\n\n\
         Выписка:\n{statement_json}\n\n\
         Верни ответ в формате JSON массива объектов с полями:\n\
         - transactionIndex: индекс транзакции в выписке (с нуля)\n\
         - category: категория (например: Продукты, Транспорт, Развлечения, Здоровье, Образование, \
         Коммунальные услуги, Рестораны, Покупки, Подписки, Прочее)\n\
         - subcategory: подкатегория\n\
         - confidence: уверенность от 0 до 1\n\n\
         Пример ответа:\n\
         [\n  {{\"transactionIndex\": 0, \"category\": \"Продукты\", \"subcategory\": \"Супермаркет\", \"confidence\": 0.95}},\n  \
         {{\"transactionIndex\": 1, \"category\": \"Транспорт\", \"subcategory\": \"Такси\", \"confidence\": 0.9}}\n]"
    )
}

pub fn subscriptions(statement_json: &str) -> String {
    format!(
        "Найди подписки (регулярные платежи) среди транзакций выписки.\n\n\
         Выписка:\n{statement_json}\n\n\
         Верни ответ в формате JSON массива объектов с полями:\n\
         - name: название подписки\n\
         - amount: сумма\n\
         - frequency: частота: \"monthly\", \"yearly\" или \"weekly\"\n\
         - lastPayment: дата последнего платежа\n\
         - transactionIndices: массив индексов транзакций этой подписки\n\n\
         Пример:\n\
         [\n  {{\"name\": \"Netflix\", \"amount\": 999, \"frequency\": \"monthly\", \
         \"lastPayment\": \"2024-01-15\", \"transactionIndices\": [5, 12, 19]}}\n]"
    )
}

pub fn forecast(statement_json: &str) -> String {
    format!(
        "Спрогнозируй расходы на следующие 3 месяца по историческим транзакциям.\n\n\
         Выписка:\n{statement_json}\n\n\
         Верни ответ в формате JSON:\n\
         {{\n  \"nextMonth\": {{\"total\": число, \"byCategory\": {{\"категория\": число}}}},\n  \
         \"month2\": {{\"total\": число, \"byCategory\": {{\"категория\": число}}}},\n  \
         \"month3\": {{\"total\": число, \"byCategory\": {{\"категория\": число}}}},\n  \
         \"trends\": \"описание трендов\",\n  \"confidence\": число от 0 до 1\n}}"
    )
}

pub fn recommendations(
    statement_json: &str,
    classifications_json: &str,
    subscriptions_json: &str,
    forecast_json: &str,
) -> String {
    format!(
        "Дай практические рекомендации по оптимизации расходов на основе транзакций.\n\n\
         Выписка:\n{statement_json}\n\
         Классификация: {classifications_json}\n\
         Подписки: {subscriptions_json}\n\
         Прогноз: {forecast_json}\n\n\
         Верни ответ в формате JSON массива рекомендаций:\n\
         [\n  {{\n    \"type\": \"saving\" | \"optimization\" | \"warning\" | \"tip\",\n    \
         \"priority\": \"high\" | \"medium\" | \"low\",\n    \"title\": \"заголовок\",\n    \
         \"description\": \"подробное описание\",\n    \"potentialSavings\": число или null\n  }}\n]"
    )
}
