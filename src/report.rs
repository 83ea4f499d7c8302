// Templated strategic report; no analysis is performed

use chrono::NaiveDate;
use serde::Serialize;

use crate::order::OrderRequest;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub content: String,
}

/// Render the report for `order` as of `date`.
pub fn generate(order: &OrderRequest, date: NaiveDate) -> Report {
    let content = format!(
        r#"
# Strategic Analysis Report

## Executive Summary
Your strategic analysis for "{topic}" has been completed.

## Key Insights
1. Market positioning and competitive advantage
2. Growth opportunities and expansion strategies
3. Risk mitigation and contingency planning

## Recommendations
Based on advanced AI analysis, we recommend:
- Implementing automated workflows
- Leveraging AI for decision-making
- Scaling operations efficiently

## Implementation Roadmap
- Phase 1: Foundation (Weeks 1-2)
- Phase 2: Development (Weeks 3-4)
- Phase 3: Launch (Week 5)

Generated for: {name}
Date: {date}
"#,
        topic = order.topic,
        name = order.customer_name,
        date = date.format("%-m/%-d/%Y"),
    );

    Report {
        title: format!("Strategic Report: {}", order.topic),
        content,
    }
}
