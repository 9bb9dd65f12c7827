//! Brand guideline prompt blocks.
//!
//! Every generation prompt opens with the brand constraints so each image
//! stays on-brand regardless of what the user typed. Edit the constants
//! here and restart to change the brand voice.

use once_cell::sync::Lazy;

pub const BRAND_NAME: &str = "TRDST";
pub const BRAND_DESCRIPTION: &str = "Premium high-end furniture and lighting brand";

const BRAND_VALUES: [&str; 5] = [
    "Timeless elegance and sophisticated design",
    "Modern luxury with clean lines",
    "Warm, inviting atmosphere",
    "Professional interior styling",
    "Premium materials and craftsmanship",
];

const COLOR_PALETTE: [(&str, &str); 9] = [
    ("cream", "#F5F2ED"),
    ("beige", "#D4C5B5"),
    ("charcoal", "#2C2C2C"),
    ("gold", "#C9A962"),
    ("bronze", "#8B6914"),
    ("warm white", "#FAF8F5"),
    ("text dark", "#2C2C2C"),
    ("text light", "#F5F2ED"),
    ("text muted", "#8A8A8A"),
];

const VISUAL_STYLE: [&str; 10] = [
    "Minimalist yet luxurious",
    "Warm and inviting",
    "Aspirational and sophisticated",
    "Natural lighting preferred",
    "Subtle shadows",
    "Soft, diffused light",
    "Warm color temperature",
    "Clean, uncluttered backgrounds",
    "Neutral tones that don't distract",
    "Professional studio or luxury lifestyle settings",
];

const TYPOGRAPHY_PRIMARY: &str =
    "Modern Didone/Didot serif - High contrast, elegant hairline strokes";
const TYPOGRAPHY_SECONDARY: &str =
    "Refined geometric sans-serif (Futura, Avenir, Proxima Nova)";

const TYPOGRAPHY_GUIDELINES: [&str; 4] = [
    "Generous letter-spacing for luxury feel",
    "Thin, elegant weights for headlines",
    "High contrast between thick and thin strokes",
    "Clean, sophisticated appearance",
];

const TYPOGRAPHY_AVOID: [&str; 4] = [
    "Bold/heavy weights",
    "Playful fonts",
    "Decorative scripts",
    "Condensed typefaces",
];

static BRAND_PROMPT: Lazy<String> = Lazy::new(|| {
    let colors = COLOR_PALETTE
        .iter()
        .map(|(name, code)| format!("{name} ({code})"))
        .collect::<Vec<_>>()
        .join(", ");
    let values = BRAND_VALUES
        .iter()
        .map(|v| format!("- {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    let style = VISUAL_STYLE
        .iter()
        .map(|v| format!("- {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    let typography_rules = TYPOGRAPHY_GUIDELINES
        .iter()
        .map(|g| format!("  * {g}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Create a premium marketing image for {BRAND_NAME} brand.\n\n\
         {BRAND_NAME} Brand Guidelines:\n- {BRAND_DESCRIPTION}\n{values}\n\n\
         Visual Style Requirements:\n- Color palette: {colors}\n{style}\n\n\
         Typography Guidelines (if text is included):\n\
         - Primary Font Style: {TYPOGRAPHY_PRIMARY}\n\
         - Secondary Font Style: {TYPOGRAPHY_SECONDARY}\n\
         - Characteristics:\n{typography_rules}\n\
         - Avoid: {}",
        TYPOGRAPHY_AVOID.join(", ")
    )
});

static CONVERSATION_GUIDELINES: Lazy<String> = Lazy::new(|| {
    format!(
        "## {BRAND_NAME} Brand Guidelines\n\
         - Premium, high-end aesthetic\n\
         - Neutral warm tones (cream, beige, charcoal, gold accents)\n\
         - Clean, minimalist yet luxurious\n\
         - Professional studio or lifestyle settings\n\
         - Natural lighting, subtle shadows\n\n\
         ## Typography Guidelines (when text is needed)\n\
         - Primary: {TYPOGRAPHY_PRIMARY}\n\
         - Secondary: {TYPOGRAPHY_SECONDARY}\n\
         - Avoid: {}",
        TYPOGRAPHY_AVOID[..3].join(", ")
    )
});

/// Full brand prompt block prepended to every image generation prompt.
pub fn brand_prompt() -> &'static str {
    &BRAND_PROMPT
}

/// Condensed guideline block for conversational system prompts.
pub fn conversation_guidelines() -> &'static str {
    &CONVERSATION_GUIDELINES
}
