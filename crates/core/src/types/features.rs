//! Closed-vocabulary content feature tags and bandit arm identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_rules! ordinal_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All values, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The `dimension:value` wire form used as a bandit arm id.
            pub fn arm_value(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }
    };
}

ordinal_enum!(Depth {
    Introductory => "introductory",
    Intermediate => "intermediate",
    Expert => "expert",
});

ordinal_enum!(Style {
    Academic => "academic",
    Technical => "technical",
    Journalistic => "journalistic",
    Conversational => "conversational",
});

ordinal_enum!(Format {
    Tutorial => "tutorial",
    Research => "research",
    Opinion => "opinion",
    Reference => "reference",
});

ordinal_enum!(Approach {
    Conceptual => "conceptual",
    Practical => "practical",
    DataDriven => "data-driven",
});

ordinal_enum!(Density {
    Concise => "concise",
    Moderate => "moderate",
    Comprehensive => "comprehensive",
});

/// The fixed 5-tuple of closed-vocabulary ordinals tagged onto a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentFeatures {
    pub depth: Depth,
    pub style: Style,
    pub format: Format,
    pub approach: Approach,
    pub density: Density,
}

impl ContentFeatures {
    /// The neutral default substituted when feature tagging fails or is
    /// bypassed (short body).
    pub const fn neutral() -> Self {
        Self {
            depth: Depth::Intermediate,
            style: Style::Journalistic,
            format: Format::Reference,
            approach: Approach::Practical,
            density: Density::Moderate,
        }
    }

    /// The five `dimension:value` arm identifiers for these features.
    /// Matches `^[a-z]+:[a-z-]+$`.
    pub fn arms(&self) -> [String; 5] {
        [
            format!("depth:{}", self.depth.arm_value()),
            format!("style:{}", self.style.arm_value()),
            format!("format:{}", self.format.arm_value()),
            format!("approach:{}", self.approach.arm_value()),
            format!("density:{}", self.density.arm_value()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_ids_match_pattern() {
        let features = ContentFeatures {
            depth: Depth::Expert,
            style: Style::Technical,
            format: Format::Tutorial,
            approach: Approach::DataDriven,
            density: Density::Comprehensive,
        };
        for arm in features.arms() {
            let (dim, val) = arm.split_once(':').unwrap();
            assert!(dim.chars().all(|c| c.is_ascii_lowercase()));
            assert!(val.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
        }
        assert_eq!(features.arms()[0], "depth:expert");
        assert_eq!(features.arms()[3], "approach:data-driven");
    }

    #[test]
    fn neutral_default_is_the_documented_one() {
        let n = ContentFeatures::neutral();
        assert_eq!(n.depth, Depth::Intermediate);
        assert_eq!(n.style, Style::Journalistic);
        assert_eq!(n.format, Format::Reference);
        assert_eq!(n.approach, Approach::Practical);
        assert_eq!(n.density, Density::Moderate);
    }
}
