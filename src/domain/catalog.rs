//! Marketing image catalog: purposes, style presets, and their prompt hints.
//!
//! Purposes and styles are closed enums; an unknown token anywhere on the
//! wire is a deserialization error, never a silent fallback. The generation
//! API only accepts a fixed set of aspect-ratio tokens, so each purpose maps
//! to the closest supported one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketing purpose a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImagePurpose {
    #[default]
    SnsInstagramSquare,
    SnsInstagramPortrait,
    SnsFacebook,
    BannerWeb,
    BannerMobile,
    ProductShowcase,
    EmailHeader,
    Custom,
}

impl ImagePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePurpose::SnsInstagramSquare => "sns_instagram_square",
            ImagePurpose::SnsInstagramPortrait => "sns_instagram_portrait",
            ImagePurpose::SnsFacebook => "sns_facebook",
            ImagePurpose::BannerWeb => "banner_web",
            ImagePurpose::BannerMobile => "banner_mobile",
            ImagePurpose::ProductShowcase => "product_showcase",
            ImagePurpose::EmailHeader => "email_header",
            ImagePurpose::Custom => "custom",
        }
    }

    /// Aspect-ratio token sent to the generation API.
    ///
    /// The API supports a closed token set, so nominal ratios map to the
    /// closest supported value (4:5 portrait is requested as 9:16, wide
    /// banners as 16:9). Purposes without a dedicated mapping fall back
    /// to square.
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            ImagePurpose::SnsInstagramSquare | ImagePurpose::ProductShowcase => "1:1",
            ImagePurpose::SnsInstagramPortrait => "9:16",
            ImagePurpose::SnsFacebook
            | ImagePurpose::BannerWeb
            | ImagePurpose::BannerMobile
            | ImagePurpose::EmailHeader => "16:9",
            _ => "1:1",
        }
    }

    /// Purpose-specific prompt hint prepended to generation prompts.
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            ImagePurpose::SnsInstagramSquare => {
                "Create a square format (1:1) marketing image optimized for Instagram feed"
            }
            ImagePurpose::SnsInstagramPortrait => {
                "Create a portrait format (4:5) marketing image optimized for Instagram feed"
            }
            ImagePurpose::SnsFacebook => {
                "Create a landscape format (1.91:1) marketing image optimized for Facebook feed"
            }
            ImagePurpose::BannerWeb => {
                "Create a wide banner format (3:1) marketing image for website hero section"
            }
            ImagePurpose::BannerMobile => {
                "Create a mobile banner format (2:1) marketing image for mobile website"
            }
            ImagePurpose::ProductShowcase => {
                "Create a square format product showcase image with clean background"
            }
            ImagePurpose::EmailHeader => {
                "Create a wide header format (3:1) marketing image for email newsletter"
            }
            ImagePurpose::Custom => "Create a marketing image",
        }
    }

    /// Built-in preset for this purpose, if one exists.
    ///
    /// `custom` has no preset dimensions.
    pub fn preset(&self) -> Option<&'static PurposePreset> {
        purpose_presets().iter().find(|p| p.purpose == *self)
    }

    /// Nominal pixel dimensions from the preset, when defined.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.preset().map(|p| (p.width, p.height))
    }
}

impl fmt::Display for ImagePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Visual style preset applied on top of the purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StylePreset {
    Modern,
    Minimal,
    Vibrant,
    Luxury,
    Playful,
    Professional,
    Natural,
    Tech,
}

impl StylePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            StylePreset::Modern => "modern",
            StylePreset::Minimal => "minimal",
            StylePreset::Vibrant => "vibrant",
            StylePreset::Luxury => "luxury",
            StylePreset::Playful => "playful",
            StylePreset::Professional => "professional",
            StylePreset::Natural => "natural",
            StylePreset::Tech => "tech",
        }
    }

    /// Style-specific prompt hint appended to generation prompts.
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            StylePreset::Modern => "modern and contemporary style with clean lines",
            StylePreset::Minimal => "minimalist style with abundant white space",
            StylePreset::Vibrant => "vibrant and energetic style with bold colors",
            StylePreset::Luxury => "luxurious and elegant premium style",
            StylePreset::Playful => "playful and fun style with dynamic elements",
            StylePreset::Professional => "professional and corporate style",
            StylePreset::Natural => "natural and organic style with soft tones",
            StylePreset::Tech => "high-tech futuristic style",
        }
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display metadata for a built-in purpose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PurposePreset {
    pub purpose: ImagePurpose,
    pub name: &'static str,
    pub ratio: &'static str,
    pub width: u32,
    pub height: u32,
    pub description: &'static str,
}

/// The built-in purpose presets, in display order.
pub fn purpose_presets() -> &'static [PurposePreset] {
    const PRESETS: [PurposePreset; 7] = [
        PurposePreset {
            purpose: ImagePurpose::SnsInstagramSquare,
            name: "Instagram Square",
            ratio: "1:1",
            width: 1080,
            height: 1080,
            description: "Square image for Instagram feed posts",
        },
        PurposePreset {
            purpose: ImagePurpose::SnsInstagramPortrait,
            name: "Instagram Portrait",
            ratio: "4:5",
            width: 1080,
            height: 1350,
            description: "Portrait image for Instagram feed posts",
        },
        PurposePreset {
            purpose: ImagePurpose::SnsFacebook,
            name: "Facebook Feed",
            ratio: "1.91:1",
            width: 1200,
            height: 630,
            description: "Landscape image for Facebook feed posts",
        },
        PurposePreset {
            purpose: ImagePurpose::BannerWeb,
            name: "Web Banner",
            ratio: "3:1",
            width: 1920,
            height: 640,
            description: "Wide banner for website hero sections",
        },
        PurposePreset {
            purpose: ImagePurpose::BannerMobile,
            name: "Mobile Banner",
            ratio: "2:1",
            width: 800,
            height: 400,
            description: "Banner for mobile web layouts",
        },
        PurposePreset {
            purpose: ImagePurpose::ProductShowcase,
            name: "Product Showcase",
            ratio: "1:1",
            width: 1000,
            height: 1000,
            description: "Square product image with a clean background",
        },
        PurposePreset {
            purpose: ImagePurpose::EmailHeader,
            name: "Email Header",
            ratio: "3:1",
            width: 600,
            height: 200,
            description: "Header image for email newsletters",
        },
    ];
    &PRESETS
}
