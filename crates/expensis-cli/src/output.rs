use std::io::Write;

use expensis_core::model::sort_by_priority;
use expensis_core::{AnalysisResult, Config, ExtractedStatement, Priority, Transaction};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn heading(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", title.bold())
    } else {
        writeln!(w, "{}", title)
    }
}

fn signed(amount: f64, color: ColorMode) -> String {
    let text = format!("{:>12.2}", amount);
    if !color.enabled() {
        return text;
    }
    if amount < 0.0 {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}

pub fn print_transactions(
    w: &mut dyn Write,
    transactions: &[Transaction],
    color: ColorMode,
) -> std::io::Result<()> {
    for (i, tx) in transactions.iter().enumerate() {
        writeln!(
            w,
            "{:>4}  {:<12} {}  {}  {}",
            i,
            tx.date,
            signed(tx.amount, color),
            tx.operation_type,
            tx.details
        )?;
    }
    Ok(())
}

/// Print what `extract` found in a PDF.
pub fn print_extraction(
    w: &mut dyn Write,
    name: &str,
    extracted: &ExtractedStatement,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(
        w,
        "Extracted {} transactions from {} (method: {})",
        extracted.transactions.len(),
        name,
        extracted.method
    )?;
    heading(w, "Transactions", color)?;
    print_transactions(w, &extracted.transactions, color)
}

/// Print a readable summary of an analysis.
pub fn print_analysis(
    w: &mut dyn Write,
    result: &AnalysisResult,
    color: ColorMode,
) -> std::io::Result<()> {
    let stats = &result.statistics;

    heading(w, "Statistics", color)?;
    writeln!(w, "  Transactions: {}", stats.total_transactions)?;
    writeln!(w, "  Income:       {}", signed(stats.total_income, color))?;
    writeln!(w, "  Expenses:     {}", signed(-stats.total_expenses, color))?;
    writeln!(w, "  Net:          {}", signed(stats.net(), color))?;
    writeln!(w, "  Average:      {:>12.2}", stats.average_transaction)?;

    if !stats.categories.is_empty() {
        heading(w, "Categories", color)?;
        let mut categories: Vec<(&String, &f64)> = stats.categories.iter().collect();
        categories.sort_by(|a, b| b.1.total_cmp(a.1));
        for (name, amount) in categories {
            writeln!(w, "  {:<24} {:>12.2}", name, amount)?;
        }
    }

    if !result.subscriptions.is_empty() {
        heading(w, "Subscriptions", color)?;
        for sub in &result.subscriptions {
            writeln!(
                w,
                "  {:<24} {:>10.2} {:?}, {:.2} per year (last: {})",
                sub.name,
                sub.amount,
                sub.frequency,
                sub.annual_cost(),
                if sub.last_payment.is_empty() { "-" } else { sub.last_payment.as_str() }
            )?;
        }
    }

    if !result.forecast.is_empty() {
        heading(w, "Forecast", color)?;
        for (i, month) in result.forecast.months().iter().enumerate() {
            if let Some(month) = month {
                writeln!(w, "  Month {}: {:.2}", i + 1, month.total)?;
            }
        }
        if let Some(trends) = &result.forecast.trends {
            writeln!(w, "  Trends: {}", trends)?;
        }
        if let Some(confidence) = result.forecast.confidence {
            writeln!(w, "  Confidence: {:.0}%", confidence * 100.0)?;
        }
    }

    if !result.recommendations.is_empty() {
        heading(w, "Recommendations", color)?;
        let mut recommendations = result.recommendations.clone();
        sort_by_priority(&mut recommendations);
        for rec in &recommendations {
            let tag = format!("[{:?}]", rec.priority).to_uppercase();
            if color.enabled() {
                let tag = match rec.priority {
                    Priority::High => tag.red().to_string(),
                    Priority::Medium => tag.yellow().to_string(),
                    Priority::Low => tag.dimmed().to_string(),
                };
                writeln!(w, "  {} {}", tag, rec.title.bold())?;
            } else {
                writeln!(w, "  {} {}", tag, rec.title)?;
            }
            if !rec.description.is_empty() {
                writeln!(w, "      {}", rec.description)?;
            }
            if let Some(savings) = rec.potential_savings {
                writeln!(w, "      Potential savings: {:.2}", savings)?;
            }
        }
    }

    for warning in &result.warnings {
        if color.enabled() {
            writeln!(w, "{} {}", "WARNING:".yellow(), warning)?;
        } else {
            writeln!(w, "WARNING: {}", warning)?;
        }
    }

    Ok(())
}

pub fn print_config(w: &mut dyn Write, config: &Config) -> std::io::Result<()> {
    let unset = "(unset)";
    writeln!(w, "api_url:          {}", config.api_url.as_deref().unwrap_or(unset))?;
    writeln!(
        w,
        "api_key:          {}",
        if config.api_key.is_some() { "***" } else { unset }
    )?;
    writeln!(w, "model:            {}", config.model)?;
    writeln!(w, "ocr_languages:    {}", config.ocr_languages)?;
    writeln!(w, "tesseract_path:   {}", config.tesseract_path.display())?;
    writeln!(w, "port:             {}", config.port)?;
    writeln!(w, "max_upload_mb:    {}", config.max_upload_mb)?;
    match config.request_timeout_secs {
        Some(secs) => writeln!(w, "request_timeout:  {}s", secs),
        None => writeln!(w, "request_timeout:  {}", unset),
    }
}
