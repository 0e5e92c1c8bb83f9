use std::fmt::Write as _;

use cheapfinds_contracts::history::HistoryStore;
use cheapfinds_contracts::regions::Region;
use cheapfinds_contracts::results::{
    display_host, PredictionBlock, SearchResult, SectionKind, Tier, Trend,
};

pub fn render_result(result: &SearchResult, raw: bool) -> String {
    let mut out = String::new();
    if raw {
        out.push_str(result.text.trim_end());
        out.push('\n');
    } else {
        render_sections(result, &mut out);
    }
    render_citations(result, &mut out);
    out
}

fn render_sections(result: &SearchResult, out: &mut String) {
    let interpretation = result.interpret();
    for section in &interpretation.sections {
        let heading = section.heading.as_deref().unwrap_or("").trim();
        let body = section.body.trim();
        match section.kind {
            SectionKind::Prose => {}
            SectionKind::Product => {
                let _ = writeln!(out, "\n== {heading} ==");
            }
            SectionKind::Offer(tier) => {
                let _ = writeln!(out, "\n{} {heading}", tier_badge(tier));
                if let Some(link) = section.link.as_deref() {
                    let _ = writeln!(out, "    -> {link} ({})", display_host(link));
                }
            }
            SectionKind::Prediction => {
                let _ = writeln!(out, "\n[PREDICTION] {heading}");
                render_prediction(&PredictionBlock::from_body(&section.body), out);
                continue;
            }
            SectionKind::Heading(level) => {
                let marks = "#".repeat(usize::from(level.clamp(1, 6)));
                let _ = writeln!(out, "\n{marks} {heading}");
            }
        }
        if !body.is_empty() {
            let _ = writeln!(out, "{body}");
        }
    }
}

fn render_prediction(prediction: &PredictionBlock, out: &mut String) {
    let trend = match prediction.trend {
        Some(Trend::Rising) => "rising",
        Some(Trend::Falling) => "falling",
        Some(Trend::Stable) => "stable",
        None => "unknown",
    };
    let _ = writeln!(out, "    trend: {trend}");
    if let Some(when) = prediction.best_time_to_buy.as_deref() {
        let _ = writeln!(out, "    best time to buy: {when}");
    }
    if let Some(reasoning) = prediction.reasoning.as_deref() {
        let _ = writeln!(out, "    reasoning: {reasoning}");
    }
    for note in &prediction.notes {
        let _ = writeln!(out, "{note}");
    }
}

fn render_citations(result: &SearchResult, out: &mut String) {
    if result.citations.is_empty() {
        return;
    }
    out.push_str("\nSources:\n");
    for (index, citation) in result.citations.iter().enumerate() {
        let title = if citation.title.trim().is_empty() {
            citation.host()
        } else {
            citation.title.trim().to_string()
        };
        let _ = writeln!(
            out,
            "  {}. {title} [{}] {}",
            index + 1,
            citation.host(),
            citation.uri
        );
    }
}

fn tier_badge(tier: Tier) -> &'static str {
    match tier {
        Tier::Gold => "[GOLD]",
        Tier::Silver => "[SILVER]",
        Tier::Bronze => "[BRONZE]",
    }
}

pub fn render_history(history: &HistoryStore) -> String {
    if history.is_empty() {
        return "No searches yet.\n".to_string();
    }
    let mut out = String::new();
    for (index, entry) in history.entries().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. [{}] {} ({}, {} image(s))",
            index + 1,
            entry.mode,
            entry.title(),
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.images.len()
        );
    }
    out
}

pub fn render_regions<'a>(regions: impl Iterator<Item = &'a Region>) -> String {
    let mut out = String::new();
    for region in regions {
        let _ = writeln!(out, "{:<8} {}", region.iso, region.name);
    }
    out
}

#[cfg(test)]
mod tests {
    use cheapfinds_contracts::history::HistoryStore;
    use cheapfinds_contracts::results::{CitationLink, SearchResult};
    use cheapfinds_contracts::search::{SearchMode, SearchRequest};

    use super::{render_history, render_result};

    fn sample() -> SearchResult {
        SearchResult::new(
            "**Identified:** Sony WH-1000XM5\n\n\
             ### 🥇 Gold Choice: $298 - [Amazon](https://www.amazon.com/dp/B09)\n\
             Prime shipping.\n\n\
             ### 🔮 AI Price Prediction\n\
             Using historical data for this model.\n\
             - **Trend:** 📉 Falling\n\
             - **Best Time to Buy:** Black Friday\n\n\
             ### Recommendation\n\
             Wait a month.\n",
            vec![
                CitationLink::new("https://www.amazon.com/dp/B09", "Amazon listing"),
                CitationLink::new("not a url", ""),
            ],
        )
    }

    #[test]
    fn offers_show_badge_and_link_host() {
        let rendered = render_result(&sample(), false);
        assert!(rendered.contains("[GOLD] 🥇 Gold Choice: $298 - Amazon"));
        assert!(rendered.contains("-> https://www.amazon.com/dp/B09 (amazon.com)"));
        assert!(rendered.contains("Prime shipping."));
        assert!(rendered.contains("trend: falling"));
        assert!(rendered.contains("best time to buy: Black Friday"));
        assert!(rendered.contains("Using historical data for this model."));
        assert!(rendered.contains("### Recommendation"));
    }

    #[test]
    fn citations_fall_back_to_unknown_source() {
        let rendered = render_result(&sample(), true);
        assert!(rendered.starts_with("**Identified:**"));
        assert!(rendered.contains("1. Amazon listing [amazon.com]"));
        assert!(rendered.contains("2. Unknown Source [Unknown Source] not a url"));
    }

    #[test]
    fn history_lists_newest_first() {
        let mut store = HistoryStore::new();
        assert_eq!(render_history(&store), "No searches yet.\n");
        store.record(
            &SearchRequest::new(SearchMode::Single, "Global").with_description("kettle"),
            SearchResult::new("a", Vec::new()),
        );
        store.record(
            &SearchRequest::new(SearchMode::Multi, "Global").with_description("mug, plate"),
            SearchResult::new("b", Vec::new()),
        );
        let rendered = render_history(&store);
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].contains("[multi] mug, plate"));
        assert!(lines[1].contains("[single] kettle"));
    }
}
