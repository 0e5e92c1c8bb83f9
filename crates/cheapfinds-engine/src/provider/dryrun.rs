use async_trait::async_trait;
use cheapfinds_contracts::results::{
    CitationLink, BRONZE_HEADING, GOLD_HEADING, PREDICTION_HEADING, SILVER_HEADING,
};
use cheapfinds_contracts::search::SearchMode;
use cheapfinds_contracts::TransportError;

use super::{ProviderAnswer, SearchProvider};
use crate::query::{ChatRequest, ProviderRequest};

/// Offline provider with canned, well-formed answers. Needs no credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryrunProvider;

impl DryrunProvider {
    fn podium(product: &str) -> String {
        let slug: String = product
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '-' })
            .collect();
        format!(
            "### {GOLD_HEADING}: $199.00 - [Dryrun Mart](https://mart.dryrun.example/{slug})\n\
             Lowest listed price, ships free.\n\n\
             ### {SILVER_HEADING}: $209.99 - [Sample Outlet](https://outlet.dryrun.example/{slug})\n\
             Open-box, full warranty.\n\n\
             ### {BRONZE_HEADING}: $219.50 - [Offline Electronics](https://electronics.dryrun.example/{slug})\n\
             New, in stock.\n"
        )
    }

    fn single_answer(request: &ProviderRequest) -> String {
        let product = if request.images.is_empty() {
            "Described Product"
        } else {
            "Pictured Product"
        };
        format!(
            "**Identified:** {product} (dry run, no live search performed)\n\n\
             {podium}\n\
             ### {PREDICTION_HEADING}\n\
             - **Trend:** ➖ Stable\n\
             - **Best Time to Buy:** Now\n\
             - **Reasoning:** Canned answer; prices never move offline.\n\n\
             ### Other Findings\n\
             - Refurbished units appear occasionally.\n\n\
             ### Recommendation\n\
             Buy from Dryrun Mart.\n",
            podium = Self::podium(product)
        )
    }

    fn multi_answer(request: &ProviderRequest) -> String {
        let count = request.images.len().max(1);
        (1..=count)
            .map(|index| {
                let name = format!("Dryrun Product {index}");
                format!("## {name}\n\n{}", Self::podium(&name))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn citations() -> Vec<CitationLink> {
        vec![
            CitationLink::new("https://mart.dryrun.example/", "mart.dryrun.example"),
            CitationLink::new("https://www.outlet.dryrun.example/", "outlet.dryrun.example"),
        ]
    }
}

#[async_trait]
impl SearchProvider for DryrunProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderAnswer, TransportError> {
        let text = match request.mode {
            SearchMode::Multi => Self::multi_answer(request),
            SearchMode::Single | SearchMode::Chat => Self::single_answer(request),
        };
        Ok(ProviderAnswer::from_text(text).with_citations(Self::citations()))
    }

    async fn converse(&self, request: &ChatRequest<'_>) -> Result<ProviderAnswer, TransportError> {
        let turn = request.history.len() / 2 + 1;
        Ok(ProviderAnswer::from_text(format!(
            "(dry run, turn {turn}) The cheapest match for \"{}\" is $199.00 at \
             [Dryrun Mart](https://mart.dryrun.example/).",
            request.message.trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use cheapfinds_contracts::chat::ChatSession;
    use cheapfinds_contracts::results::{SearchResult, Tier};
    use cheapfinds_contracts::search::SearchMode;

    use super::DryrunProvider;
    use crate::provider::SearchProvider;
    use crate::query::{ChatRequest, ProviderRequest};

    fn request(mode: SearchMode) -> ProviderRequest {
        ProviderRequest {
            mode,
            images: Vec::new(),
            instruction: "anything".to_string(),
        }
    }

    #[tokio::test]
    async fn single_answer_interprets_into_podium_and_prediction() -> anyhow::Result<()> {
        let answer = DryrunProvider.generate(&request(SearchMode::Single)).await?;
        let result = SearchResult::new(answer.text.unwrap_or_default(), answer.citations);
        let interpretation = result.interpret();

        let tiers: Vec<Tier> = interpretation.offers().iter().map(|offer| offer.tier).collect();
        assert_eq!(tiers, vec![Tier::Gold, Tier::Silver, Tier::Bronze]);
        assert!(interpretation.prediction().is_some());
        assert_eq!(result.citations.len(), 2);
        assert_eq!(result.citations[1].host(), "outlet.dryrun.example");
        Ok(())
    }

    #[tokio::test]
    async fn multi_answer_has_one_block_per_product() -> anyhow::Result<()> {
        let answer = DryrunProvider.generate(&request(SearchMode::Multi)).await?;
        let result = SearchResult::new(answer.text.unwrap_or_default(), Vec::new());
        let products = result.interpret().products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].offers.len(), 3);
        assert!(result.interpret().prediction().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn chat_reply_counts_turns() -> anyhow::Result<()> {
        let session = ChatSession::new("Global").with_turn("a", "b");
        let reply = DryrunProvider
            .converse(&ChatRequest {
                system_instruction: &session.system_directive,
                history: session.messages(),
                message: "cheapest kettle",
            })
            .await?;
        let text = reply.text.unwrap_or_default();
        assert!(text.contains("turn 2"));
        assert!(text.contains("cheapest kettle"));
        Ok(())
    }
}
