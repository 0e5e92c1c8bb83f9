mod interpret;

use serde::{Deserialize, Serialize};
use url::Url;

pub use interpret::{
    classify, interpret, HeadingKind, Interpretation, Offer, PredictionBlock, ProductBlock,
    Section, SectionKind, Tier, Trend,
};

pub const GOLD_HEADING: &str = "🥇 Gold Choice";
pub const SILVER_HEADING: &str = "🥈 Silver Choice";
pub const BRONZE_HEADING: &str = "🥉 Bronze Choice";
pub const PREDICTION_HEADING: &str = "🔮 AI Price Prediction";

pub const UNKNOWN_SOURCE: &str = "Unknown Source";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationLink {
    pub uri: String,
    pub title: String,
}

impl CitationLink {
    pub fn new(uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: title.into(),
        }
    }

    pub fn host(&self) -> String {
        display_host(&self.uri)
    }
}

/// Grounding metadata as the provider returns it. Only web chunks become
/// citations; other chunk kinds are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<WebSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

impl GroundingMetadata {
    pub fn from_citations(citations: &[CitationLink]) -> Self {
        Self {
            grounding_chunks: citations
                .iter()
                .map(|citation| GroundingChunk {
                    web: Some(WebSource {
                        uri: citation.uri.clone(),
                        title: citation.title.clone(),
                    }),
                })
                .collect(),
        }
    }

    pub fn web_citations(&self) -> Vec<CitationLink> {
        self.grounding_chunks
            .iter()
            .filter_map(|chunk| chunk.web.as_ref())
            .map(|web| CitationLink::new(web.uri.clone(), web.title.clone()))
            .collect()
    }
}

/// The provider's answer for one request. The raw text is the source of
/// truth; structured sections are derived from it on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<CitationLink>,
}

impl SearchResult {
    pub fn new(text: impl Into<String>, citations: Vec<CitationLink>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }

    pub fn interpret(&self) -> Interpretation {
        interpret(&self.text)
    }
}

/// Host shown next to a link, without a leading `www.`.
pub fn display_host(uri: &str) -> String {
    Url::parse(uri.trim())
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}
