use std::ops::Range;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

const MAX_OFFERS_PER_PRODUCT: usize = 3;
const PRICE_RETAILER_SEPARATORS: &[&str] = &[" - ", " – ", " — "];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Gold,
    Silver,
    Bronze,
}

impl Tier {
    pub fn rank(self) -> u8 {
        match self {
            Self::Gold => 1,
            Self::Silver => 2,
            Self::Bronze => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::Bronze => "bronze",
        }
    }
}

/// Classification of a level-3 heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingKind {
    Prediction,
    Offer(Tier),
    Generic,
}

/// Evaluated top to bottom; the first rule with a matching marker wins.
const HEADING_RULES: &[(HeadingKind, &[&str])] = &[
    (HeadingKind::Prediction, &["🔮", "ai price prediction"]),
    (HeadingKind::Offer(Tier::Gold), &["🥇", "gold choice"]),
    (HeadingKind::Offer(Tier::Silver), &["🥈", "silver choice"]),
    (HeadingKind::Offer(Tier::Bronze), &["🥉", "bronze choice"]),
];

pub fn classify(heading: &str) -> HeadingKind {
    let haystack = heading.to_lowercase();
    HEADING_RULES
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| haystack.contains(marker)))
        .map(|(kind, _)| *kind)
        .unwrap_or(HeadingKind::Generic)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Text before the first heading, or the whole answer when it has none.
    Prose,
    /// Level-2 heading introducing one product of a multi-product answer.
    Product,
    Prediction,
    Offer(Tier),
    /// Any other heading, with its level.
    Heading(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: Option<String>,
    /// Destination of the first link inside the heading.
    pub link: Option<String>,
    pub link_text: Option<String>,
    /// Raw markdown between this heading and the next one.
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub tier: Tier,
    pub price: String,
    pub retailer: String,
    pub url: Option<String>,
    pub note: String,
    pub heading: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductBlock {
    pub name: String,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Trend {
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        if lower.contains("rising") || raw.contains('📈') {
            return Some(Self::Rising);
        }
        if lower.contains("falling") || raw.contains('📉') {
            return Some(Self::Falling);
        }
        if lower.contains("stable") || raw.contains('➖') {
            return Some(Self::Stable);
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictionBlock {
    pub trend: Option<Trend>,
    pub best_time_to_buy: Option<String>,
    pub reasoning: Option<String>,
    /// Body lines that carry none of the labelled fields, kept in order.
    pub notes: Vec<String>,
}

impl PredictionBlock {
    pub fn from_body(body: &str) -> Self {
        parse_prediction(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    pub sections: Vec<Section>,
}

impl Interpretation {
    pub fn offers(&self) -> Vec<Offer> {
        self.sections.iter().filter_map(offer_from_section).collect()
    }

    /// Product blocks in answer order. Offers that appear before the first
    /// product heading belong to no block.
    pub fn products(&self) -> Vec<ProductBlock> {
        let mut blocks: Vec<ProductBlock> = Vec::new();
        for section in &self.sections {
            if section.kind == SectionKind::Product {
                blocks.push(ProductBlock {
                    name: section.heading.clone().unwrap_or_default(),
                    offers: Vec::new(),
                });
                continue;
            }
            let Some(block) = blocks.last_mut() else {
                continue;
            };
            if block.offers.len() >= MAX_OFFERS_PER_PRODUCT {
                continue;
            }
            if let Some(offer) = offer_from_section(section) {
                block.offers.push(offer);
            }
        }
        blocks
    }

    pub fn prediction(&self) -> Option<PredictionBlock> {
        self.sections
            .iter()
            .find(|section| section.kind == SectionKind::Prediction)
            .map(|section| parse_prediction(&section.body))
    }
}

/// Splits an answer into display sections. Never fails: text without
/// recognised headings comes back as a single prose section.
pub fn interpret(text: &str) -> Interpretation {
    let headings = scan_headings(text);
    let mut sections = Vec::with_capacity(headings.len() + 1);

    let first_start = headings
        .first()
        .map(|heading| heading.span.start)
        .unwrap_or(text.len());
    let preamble = slice(text, 0, first_start);
    if !preamble.is_empty() || headings.is_empty() {
        sections.push(Section {
            kind: SectionKind::Prose,
            heading: None,
            link: None,
            link_text: None,
            body: preamble.to_string(),
        });
    }

    for (idx, heading) in headings.iter().enumerate() {
        let body_end = headings
            .get(idx + 1)
            .map(|next| next.span.start)
            .unwrap_or(text.len());
        let title = heading.text.trim().to_string();
        let kind = match heading.level {
            2 => SectionKind::Product,
            3 => match classify(&title) {
                HeadingKind::Prediction => SectionKind::Prediction,
                HeadingKind::Offer(tier) => SectionKind::Offer(tier),
                HeadingKind::Generic => SectionKind::Heading(3),
            },
            level => SectionKind::Heading(level),
        };
        sections.push(Section {
            kind,
            heading: Some(title),
            link: heading.link.clone(),
            link_text: heading
                .link_text
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            body: slice(text, heading.span.end, body_end).to_string(),
        });
    }

    Interpretation { sections }
}

#[derive(Debug)]
struct ScannedHeading {
    level: u8,
    span: Range<usize>,
    text: String,
    link: Option<String>,
    link_text: Option<String>,
    in_first_link: bool,
}

fn scan_headings(text: &str) -> Vec<ScannedHeading> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut out = Vec::new();
    let mut current: Option<ScannedHeading> = None;
    for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                current = Some(ScannedHeading {
                    level: heading_level(level),
                    span: range,
                    text: String::new(),
                    link: None,
                    link_text: None,
                    in_first_link: false,
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = current.take() {
                    out.push(heading);
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                if let Some(heading) = current.as_mut() {
                    if heading.link.is_none() {
                        heading.link = Some(dest_url.to_string());
                        heading.link_text = Some(String::new());
                        heading.in_first_link = true;
                    }
                }
            }
            Event::End(TagEnd::Link) => {
                if let Some(heading) = current.as_mut() {
                    heading.in_first_link = false;
                }
            }
            Event::Text(value) | Event::Code(value) => {
                if let Some(heading) = current.as_mut() {
                    heading.text.push_str(&value);
                    if heading.in_first_link {
                        if let Some(link_text) = heading.link_text.as_mut() {
                            link_text.push_str(&value);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn slice(text: &str, start: usize, end: usize) -> &str {
    text.get(start..end).unwrap_or("").trim()
}

fn offer_from_section(section: &Section) -> Option<Offer> {
    let SectionKind::Offer(tier) = section.kind else {
        return None;
    };
    let heading = section.heading.clone().unwrap_or_default();
    let detail = heading
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(heading.as_str())
        .trim();
    let (price, retailer_text) = PRICE_RETAILER_SEPARATORS
        .iter()
        .find_map(|separator| detail.split_once(separator))
        .map(|(price, retailer)| (price.trim(), retailer.trim()))
        .unwrap_or((detail, ""));
    let retailer = section
        .link_text
        .clone()
        .unwrap_or_else(|| retailer_text.to_string());

    Some(Offer {
        tier,
        price: price.to_string(),
        retailer,
        url: section.link.clone(),
        note: section.body.clone(),
        heading,
    })
}

fn parse_prediction(body: &str) -> PredictionBlock {
    let mut block = PredictionBlock::default();
    for line in body.lines() {
        let cleaned = line
            .trim()
            .trim_start_matches(|ch: char| matches!(ch, '-' | '*' | '•') || ch.is_whitespace())
            .replace("**", "")
            .replace("__", "");
        if cleaned.is_empty() {
            continue;
        }
        let labelled = cleaned
            .split_once(':')
            .map(|(label, value)| (label.trim().to_lowercase(), value.trim()))
            .filter(|(_, value)| !value.is_empty());
        match labelled {
            Some((label, value)) if label == "trend" && block.trend.is_none() => {
                block.trend = Trend::parse(value);
            }
            Some((label, value))
                if label == "best time to buy" && block.best_time_to_buy.is_none() =>
            {
                block.best_time_to_buy = Some(value.to_string());
            }
            Some((label, value)) if label == "reasoning" && block.reasoning.is_none() => {
                block.reasoning = Some(value.to_string());
            }
            _ => block.notes.push(line.trim().to_string()),
        }
    }
    block
}
