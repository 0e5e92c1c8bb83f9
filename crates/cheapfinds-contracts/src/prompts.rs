//! Mode-specific instruction text sent to the provider.
//!
//! The headings requested here are the same literals the result interpreter
//! recognises, so both sides are built from the constants in
//! [`crate::results`].

use crate::error::PipelineError;
use crate::regions::GLOBAL_REGION;
use crate::results::{BRONZE_HEADING, GOLD_HEADING, PREDICTION_HEADING, SILVER_HEADING};
use crate::search::{SearchMode, SearchRequest};

const MARKETPLACES: &str = "Amazon, eBay, Walmart, Target, AliExpress, Temu, Shein";

/// Builds the single instruction string for a one-shot search.
pub fn build_instruction(request: &SearchRequest) -> Result<String, PipelineError> {
    request.ensure_sendable()?;
    match request.mode {
        SearchMode::Single => Ok(single_instruction(request)),
        SearchMode::Multi => Ok(multi_instruction(request)),
        SearchMode::Chat => Err(PipelineError::invalid(
            "chat messages are sent through a chat session, not a one-shot search",
        )),
    }
}

/// Fixed directive attached once when a chat session is created.
pub fn chat_directive(region: &str) -> String {
    let region = region_label(region);
    format!(
        "You are an expert AI shopping assistant whose only goal is to find the lowest real prices for a user in {region}.\n\
\n\
1. Identify the exact product model, version and specs before searching. If the request is vague, ask for clarification or pick the most popular specific model.\n\
2. ALWAYS use live Google Search to find current prices across major retailers ({MARKETPLACES}) and local stores in {region}.\n\
3. ALWAYS sort candidate prices from lowest to highest.\n\
4. The best option is the cheapest option unless the user asks for specific features.\n\
5. Highlight the absolute lowest price clearly.\n\
6. Format every retailer mention as a Markdown link: [Retailer Name](URL).\n\
7. Be concise and focus on price data."
    )
}

pub fn region_clause(region: &str) -> String {
    if is_global(region) {
        return "Search globally for the best international rates.".to_string();
    }
    format!(
        "Focus strictly on retailers available in or shipping to {region}. \
Convert prices to the local currency of {region} if possible. \
Include international retailers like Shein, Temu, or AliExpress ONLY if they deliver to {region}."
    )
}

fn is_global(region: &str) -> bool {
    let trimmed = region.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(GLOBAL_REGION)
}

fn region_label(region: &str) -> &str {
    if is_global(region) {
        "any country (global search)"
    } else {
        region.trim()
    }
}

fn podium_lines() -> String {
    format!(
        "### {GOLD_HEADING}: [Price] - [Retailer Name](URL)\n\
[The lowest price found. Brief note on condition or shipping if relevant]\n\
### {SILVER_HEADING}: [Price] - [Retailer Name](URL)\n\
[2nd lowest price]\n\
### {BRONZE_HEADING}: [Price] - [Retailer Name](URL)\n\
[3rd lowest price]"
    )
}

fn single_instruction(request: &SearchRequest) -> String {
    let description = request.description.trim();
    let has_image = !request.effective_images().is_empty();
    let context = match (has_image, description.is_empty()) {
        (true, false) => format!(
            "Analyze the uploaded image in extreme detail and consider the user's description: \"{description}\"."
        ),
        (true, true) => "Analyze this image in extreme detail.".to_string(),
        _ => format!("Analyze the product described as: \"{description}\"."),
    };
    let region = request.region.trim();
    let local_retailers = region_label(region);

    format!(
        "{context}\n\
\n\
**Step 1: PRECISE IDENTIFICATION**\n\
- Identify the exact brand, model name, model number and color/variant shown or described.\n\
- Use subtle details such as button layout, camera placement, text labels or distinctive design elements to tell versions apart (e.g. \"iPhone 15 Pro\" vs \"iPhone 15\").\n\
- If text is visible on the product, read it to confirm the identity.\n\
- Do not give generic results (e.g. for a specific Nike Air Jordan colorway, do not just search for \"Nike Shoes\").\n\
\n\
**Step 2: COMPREHENSIVE PRICE SEARCH**\n\
- Once the exact product is identified, run a deep Google Search for the lowest current price of this exact model.\n\
- Check major platforms ({MARKETPLACES}) and local retailers in {local_retailers}.\n\
- {clause}\n\
\n\
**Step 3: REPORT**\n\
Structure the response exactly as follows:\n\
\n\
1. **Product Identification**: the full specific name (brand + model + specs) and the visual or textual cues used to identify it.\n\
\n\
2. **Top 3 Deals**: the 3 lowest prices available right now for this EXACT product, ranked strictly from lowest to highest price.\n\
\n\
{podium}\n\
\n\
Make sure every retailer name is a Markdown link to the product page.\n\
\n\
3. **Price Prediction**: a block under this exact heading:\n\
\n\
### {PREDICTION_HEADING}\n\
Using historical data and current market signals, predict the price trajectory.\n\
- **Trend**: [Rising 📈 / Falling 📉 / Stable ➖]\n\
- **Best Time to Buy**: [e.g. \"Buy Now - Historic Low\", \"Wait 2 weeks for sales\"]\n\
- **Reasoning**: [Brief explanation]\n\
\n\
4. **Other Findings**: a comparison list of other retailers found.\n\
5. **Recommendation**: a final verdict on the best value.",
        clause = region_clause(region),
        podium = podium_lines(),
    )
}

fn multi_instruction(request: &SearchRequest) -> String {
    let description = request.description.trim();
    let region = request.region.trim();
    let local_retailers = region_label(region);

    format!(
        "You are an expert product analyst and price hunter.\n\
\n\
Step 1: PRECISE IDENTIFICATION\n\
Analyze the provided images and/or the description list: \"{description}\".\n\
Identify ALL distinct products mentioned or shown with extreme precision.\n\
- For images, use logos, model names, design features and text labels to find the exact make and model.\n\
- Do not use generic names (instead of \"Sony Headphones\", identify \"Sony WH-1000XM5 Silver\").\n\
- Distinguish Pro/Max/Plus versions and generations.\n\
\n\
Step 2: COMPREHENSIVE PRICE SEARCH\n\
For EACH identified product, run a deep Google Search.\n\
- Check major marketplaces ({MARKETPLACES}).\n\
- Check local retailers in {local_retailers}.\n\
- Find the absolute lowest prices available right now.\n\
{clause}\n\
\n\
Structure the response as follows using Markdown.\n\
\n\
For every product found, start a section with its own heading:\n\
## [Full Specific Product Name]\n\
\n\
Under each product heading, list its top 3 cheapest deals, ranked strictly by price (lowest price = Gold):\n\
{podium}\n\
\n\
IMPORTANT:\n\
1. The Gold Choice MUST be the cheapest option.\n\
2. Every retailer name must be a Markdown link to the product page.\n\
3. Do NOT add a general summary at the end; only list the products and their deals.",
        clause = region_clause(region),
        podium = podium_lines(),
    )
}
