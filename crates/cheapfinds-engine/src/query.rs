use cheapfinds_contracts::chat::ChatMessage;
use cheapfinds_contracts::prompts::build_instruction;
use cheapfinds_contracts::search::{SearchMode, SearchRequest};
use cheapfinds_contracts::PipelineError;

use crate::codec::{encode_image, InlineImage};

/// A one-shot request as sent to a provider: image parts first, then the
/// instruction. Live search is always enabled by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub mode: SearchMode,
    pub images: Vec<InlineImage>,
    pub instruction: String,
}

/// One chat turn: the standing directive, every earlier message in order,
/// and the new user text.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_instruction: &'a str,
    pub history: &'a [ChatMessage],
    pub message: &'a str,
}

pub fn assemble(
    request: &SearchRequest,
    max_image_dim: Option<u32>,
) -> Result<ProviderRequest, PipelineError> {
    let instruction = build_instruction(request)?;
    let images = request
        .effective_images()
        .iter()
        .map(|blob| encode_image(blob, max_image_dim))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(
        mode = %request.mode,
        region = %request.region,
        images = images.len(),
        instruction_chars = instruction.chars().count(),
        "assembled provider request"
    );
    Ok(ProviderRequest {
        mode: request.mode,
        images,
        instruction,
    })
}
