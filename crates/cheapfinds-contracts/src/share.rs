//! Shareable links: a whole result packed into one query parameter.
//!
//! Token layout: JSON `{text, groundingMetadata: {groundingChunks: [{web}]}}`,
//! percent-encoded, then base64 (URL-safe alphabet, no padding). Decoding
//! also accepts the standard alphabet, padded or not.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::PipelineError;
use crate::results::{GroundingMetadata, SearchResult};

pub const SHARE_PARAM: &str = "share";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SharePayload {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

/// Every result encodes, the empty answer included; `decode_token` gives it
/// back unchanged.
pub fn encode_token(result: &SearchResult) -> Result<String, PipelineError> {
    let payload = SharePayload {
        text: Some(result.text.clone()),
        grounding_metadata: Some(GroundingMetadata::from_citations(&result.citations)),
    };
    let json = serde_json::to_string(&payload)
        .map_err(|err| PipelineError::MalformedShareToken(err.to_string()))?;
    let escaped = urlencoding::encode(&json);
    Ok(URL_SAFE_NO_PAD.encode(escaped.as_bytes()))
}

pub fn decode_token(token: &str) -> Result<SearchResult, PipelineError> {
    let normalized: String = token
        .trim()
        .chars()
        .map(|ch| match ch {
            '-' => '+',
            '_' => '/',
            ' ' => '+',
            other => other,
        })
        .filter(|ch| *ch != '=')
        .collect();
    let bytes = STANDARD_NO_PAD
        .decode(normalized.as_bytes())
        .map_err(|err| PipelineError::MalformedShareToken(format!("base64: {err}")))?;
    let escaped = String::from_utf8(bytes)
        .map_err(|err| PipelineError::MalformedShareToken(format!("utf-8: {err}")))?;
    let json = urlencoding::decode(&escaped)
        .map_err(|err| PipelineError::MalformedShareToken(format!("percent-encoding: {err}")))?;
    let payload: SharePayload = serde_json::from_str(&json)
        .map_err(|err| PipelineError::MalformedShareToken(format!("json: {err}")))?;

    let text = payload
        .text
        .ok_or_else(|| PipelineError::MalformedShareToken("missing answer text".to_string()))?;
    let citations = payload
        .grounding_metadata
        .map(|metadata| metadata.web_citations())
        .unwrap_or_default();
    Ok(SearchResult::new(text, citations))
}

/// Link to `page` (scheme, host and path kept; query and fragment replaced)
/// carrying the result as its `share` parameter.
pub fn share_url(page: &Url, result: &SearchResult) -> Result<Url, PipelineError> {
    let token = encode_token(result)?;
    let mut url = page.clone();
    url.set_fragment(None);
    url.set_query(None);
    url.query_pairs_mut().append_pair(SHARE_PARAM, &token);
    Ok(url)
}

/// Reads a shared result from `url` if one is present and usable. On success
/// the query is cleared so the state is not applied twice; anything
/// unreadable is ignored and leaves `url` untouched.
pub fn take_shared_result(url: &mut Url) -> Option<SearchResult> {
    let token = url
        .query_pairs()
        .find(|(key, _)| key == SHARE_PARAM)
        .map(|(_, value)| value.into_owned())?;
    match decode_token(&token) {
        Ok(result) => {
            url.set_query(None);
            Some(result)
        }
        Err(err) => {
            tracing::debug!("ignoring shared result: {err}");
            None
        }
    }
}
