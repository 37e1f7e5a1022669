use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Upscale,
    Relight,
    Clarity,
    Enhance,
    Beautify,
    ReplaceBackground,
    Style,
    Comic,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldChoices {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
}

/// Static description of one selectable feature.
///
/// `id` is the identifier the form uses, `gateway_id` the one the gateway
/// route historically accepted in `x-feature-type`. Both resolve to the same
/// feature through [`Feature::from_id`].
#[derive(Clone, Copy, Debug)]
pub struct FeatureConfig {
    pub feature: Feature,
    pub id: &'static str,
    pub gateway_id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub estimated_time: &'static str,
    pub upstream_path: &'static str,
    pub direct_path: &'static str,
    pub inputs: &'static [&'static str],
    pub defaults: &'static [(&'static str, &'static str)],
    pub choices: &'static [FieldChoices],
}

impl FeatureConfig {
    pub fn accepts(&self, field: &str) -> bool {
        self.inputs.iter().any(|input| *input == field)
    }

    pub fn default_value(&self, field: &str) -> Option<&'static str> {
        self.defaults
            .iter()
            .find(|(key, _)| *key == field)
            .map(|(_, value)| *value)
    }

    pub fn default_values(&self) -> IndexMap<String, String> {
        self.defaults
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    pub fn choices_for(&self, field: &str) -> Option<&'static [&'static str]> {
        self.choices
            .iter()
            .find(|choice| choice.field == field)
            .map(|choice| choice.allowed)
    }
}

pub const DEFAULT_FEATURE_ID: &str = "upscale";
pub const DEFAULT_COMIC_PANELS: i64 = 4;
pub const DEFAULT_COMIC_STYLE: &str = "anime_color";

const RELIGHT_INPUTS: &[&str] = &[
    "image",
    "image_url",
    "prompt",
    "appended_prompt",
    "negative_prompt",
    "light_source",
    "steps",
    "cfg",
    "width",
    "height",
    "number_of_images",
    "output_format",
    "output_quality",
];

pub const FEATURES: &[FeatureConfig] = &[
    FeatureConfig {
        feature: Feature::Upscale,
        id: "upscale",
        gateway_id: "upscale",
        name: "Upscale",
        tagline: "Face restoration & enhance",
        label: "Image Upscaling (GFPGAN)",
        description: "Restore faces and upscale 1x/2x/4x",
        estimated_time: "15-90s",
        upstream_path: "/upscale",
        direct_path: "/upscale",
        inputs: &["image", "scale", "version"],
        defaults: &[("scale", "2"), ("version", "v1.4")],
        choices: &[
            FieldChoices {
                field: "scale",
                allowed: &["1", "2", "4"],
            },
            FieldChoices {
                field: "version",
                allowed: &["v1.3", "v1.4"],
            },
        ],
    },
    FeatureConfig {
        feature: Feature::Clarity,
        id: "clarity",
        gateway_id: "clarity",
        name: "Clarity",
        tagline: "Super-resolution enhancement",
        label: "Clarity Improvement (Real-ESRGAN)",
        description: "Sharpen and super-resolve 2x or 4x",
        estimated_time: "20-120s",
        upstream_path: "/clarity",
        direct_path: "/clarity",
        inputs: &["image", "scale", "faceEnhance"],
        defaults: &[("scale", "2"), ("faceEnhance", "false")],
        choices: &[
            FieldChoices {
                field: "scale",
                allowed: &["2", "4"],
            },
            FieldChoices {
                field: "faceEnhance",
                allowed: &["true", "false"],
            },
        ],
    },
    FeatureConfig {
        feature: Feature::Relight,
        id: "portraits/ic-light",
        gateway_id: "ic-light",
        name: "Relight",
        tagline: "Portrait relighting",
        label: "Portrait Relighting",
        description: "Relight a portrait from a text prompt",
        estimated_time: "30-120s",
        upstream_path: "/portraits/ic-light",
        direct_path: "/portraits/ic-light",
        inputs: RELIGHT_INPUTS,
        defaults: &[
            ("prompt", "studio soft light, flattering portrait lighting"),
            ("appended_prompt", "best quality"),
            (
                "negative_prompt",
                "lowres, bad anatomy, bad hands, cropped, worst quality",
            ),
            ("light_source", "None"),
            ("steps", "25"),
            ("cfg", "2"),
            ("number_of_images", "1"),
            ("output_format", "webp"),
            ("output_quality", "80"),
        ],
        choices: &[
            FieldChoices {
                field: "light_source",
                allowed: &["None", "Left Light", "Right Light", "Top Light", "Bottom Light"],
            },
            FieldChoices {
                field: "output_format",
                allowed: &["webp", "jpg", "png"],
            },
        ],
    },
    FeatureConfig {
        feature: Feature::Enhance,
        id: "enhance",
        gateway_id: "enhance",
        name: "Enhance",
        tagline: "Professional enhancement",
        label: "Image Enhancement (Topaz)",
        description: "Raise quality with specialised models",
        estimated_time: "15-60s",
        upstream_path: "/enhance",
        direct_path: "/enhance",
        inputs: &["image", "scale", "model"],
        defaults: &[("scale", "2"), ("model", "standard-v2")],
        choices: &[
            FieldChoices {
                field: "scale",
                allowed: &["2", "4", "6"],
            },
            FieldChoices {
                field: "model",
                allowed: &[
                    "standard-v2",
                    "low-res-v2",
                    "cgi",
                    "high-fidelity-v2",
                    "text-refine",
                ],
            },
        ],
    },
    FeatureConfig {
        feature: Feature::Beautify,
        id: "ai-beautify",
        gateway_id: "beautify",
        name: "Beautify",
        tagline: "Multi-step portrait pipeline",
        label: "AI Beautify",
        description: "Four-step pipeline for portrait photos",
        estimated_time: "30-90s",
        upstream_path: "/ai-beautify",
        direct_path: "/ai-beautify",
        inputs: &["image"],
        defaults: &[],
        choices: &[],
    },
    FeatureConfig {
        feature: Feature::ReplaceBackground,
        id: "replace-bg",
        gateway_id: "replace-bg",
        name: "Background",
        tagline: "Remove or replace background",
        label: "Background Replacement",
        description: "Remove the background or swap in a new one",
        estimated_time: "20-60s",
        upstream_path: "/replace-bg",
        direct_path: "/replace-bg",
        inputs: &[
            "fg",
            "bg",
            "mode",
            "fit",
            "position",
            "featherPx",
            "shadow",
            "signTtl",
        ],
        defaults: &[
            ("mode", "replace"),
            ("fit", "cover"),
            ("position", "centre"),
            ("featherPx", "1"),
            ("shadow", "1"),
            ("signTtl", "3600"),
        ],
        choices: &[
            FieldChoices {
                field: "mode",
                allowed: &["remove", "replace"],
            },
            FieldChoices {
                field: "fit",
                allowed: &["cover", "contain", "fill", "inside", "outside"],
            },
            FieldChoices {
                field: "position",
                allowed: &["centre", "top", "bottom", "left", "right"],
            },
            FieldChoices {
                field: "shadow",
                allowed: &["0", "1"],
            },
        ],
    },
    FeatureConfig {
        feature: Feature::Style,
        id: "style",
        gateway_id: "style",
        name: "Style",
        tagline: "Artistic style transfer",
        label: "Style Transfer",
        description: "Turn a photo into an artistic style",
        estimated_time: "30-150s",
        upstream_path: "/style",
        direct_path: "/style/replace-style",
        inputs: &["image", "style", "extra"],
        defaults: &[("style", "anime")],
        choices: &[FieldChoices {
            field: "style",
            allowed: &[
                "anime",
                "ghibli",
                "watercolor",
                "oil-painting",
                "sketches",
                "cartoon",
            ],
        }],
    },
    FeatureConfig {
        feature: Feature::Comic,
        id: "comic/generate",
        gateway_id: "comic",
        name: "Comic",
        tagline: "Generate comic stories",
        label: "Comic Generation",
        description: "Generate a comic page from a text prompt",
        estimated_time: "60-240s",
        upstream_path: "/comic/generate",
        direct_path: "/comic/generate",
        inputs: &["prompt", "panels", "style"],
        defaults: &[("panels", "4"), ("style", DEFAULT_COMIC_STYLE)],
        choices: &[
            FieldChoices {
                field: "panels",
                allowed: &["1", "2", "3", "4", "5", "6"],
            },
            FieldChoices {
                field: "style",
                allowed: &[DEFAULT_COMIC_STYLE],
            },
        ],
    },
];

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Upscale,
        Feature::Clarity,
        Feature::Relight,
        Feature::Enhance,
        Feature::Beautify,
        Feature::ReplaceBackground,
        Feature::Style,
        Feature::Comic,
    ];

    /// Resolves either the form id or the gateway id.
    pub fn from_id(raw: &str) -> Option<Feature> {
        let needle = raw.trim();
        FEATURES
            .iter()
            .find(|config| config.id == needle || config.gateway_id == needle)
            .map(|config| config.feature)
    }

    pub fn config(self) -> &'static FeatureConfig {
        FEATURES
            .iter()
            .find(|config| config.feature == self)
            .unwrap_or(&FEATURES[0])
    }

    pub fn id(self) -> &'static str {
        self.config().id
    }

    pub fn gateway_id(self) -> &'static str {
        self.config().gateway_id
    }

    pub fn upstream_path(self) -> &'static str {
        self.config().upstream_path
    }

    pub fn direct_path(self) -> &'static str {
        self.config().direct_path
    }

    /// Only comic generation is sent upstream as a JSON document.
    pub fn sends_json(self) -> bool {
        matches!(self, Feature::Comic)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

pub fn search_features(query: &str) -> Vec<&'static FeatureConfig> {
    let needle = query.trim().to_lowercase();
    FEATURES
        .iter()
        .filter(|config| {
            needle.is_empty()
                || config.name.to_lowercase().contains(&needle)
                || config.tagline.to_lowercase().contains(&needle)
        })
        .collect()
}
