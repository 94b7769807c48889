//! Enumerations describing how a node binds to the host and how it is shaded.
//!
//! All of these are parsed from strings found in the serialized avatar. Parsing is
//! lenient: an unknown value logs a warning and falls back to the neutral variant so
//! that the rest of the node still loads.

use std::{fmt, str::FromStr};

use bitflags::bitflags;

/// Host-skeleton joint or special slot a node is composed against.
///
/// The serialized names are kept for compatibility with existing exports, which is why
/// wing and shoulder slots parse from `*ElytraOrigin` and `*ParrotOrigin`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentPoint {
    #[default]
    Model,
    Head,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Torso,
    World,
    LeftItemOrigin,
    RightItemOrigin,
    LeftWingOrigin,
    RightWingOrigin,
    LeftShoulderOrigin,
    RightShoulderOrigin,
    LeftWing,
    RightWing,
    LeftSpyglass,
    RightSpyglass,
    Camera,
    Skull,
    Hud,
}

impl AttachmentPoint {
    pub const ALL: [AttachmentPoint; 21] = [
        Self::Model,
        Self::Head,
        Self::LeftArm,
        Self::RightArm,
        Self::LeftLeg,
        Self::RightLeg,
        Self::Torso,
        Self::World,
        Self::LeftItemOrigin,
        Self::RightItemOrigin,
        Self::LeftWingOrigin,
        Self::RightWingOrigin,
        Self::LeftShoulderOrigin,
        Self::RightShoulderOrigin,
        Self::LeftWing,
        Self::RightWing,
        Self::LeftSpyglass,
        Self::RightSpyglass,
        Self::Camera,
        Self::Skull,
        Self::Hud,
    ];

    /// Special slots never take part in the regular passes. The host renders them on its
    /// own schedule (tab-list skulls, HUD overlay, wing models, world-space parts).
    pub fn is_special(self) -> bool {
        matches!(
            self,
            Self::World | Self::LeftWing | Self::RightWing | Self::Skull | Self::Hud
        )
    }

    /// The host joint this slot follows, if it is one of the six body joints.
    pub fn joint(self) -> Option<Joint> {
        match self {
            Self::Head => Some(Joint::Head),
            Self::Torso => Some(Joint::Torso),
            Self::LeftArm => Some(Joint::LeftArm),
            Self::RightArm => Some(Joint::RightArm),
            Self::LeftLeg => Some(Joint::LeftLeg),
            Self::RightLeg => Some(Joint::RightLeg),
            _ => None,
        }
    }

    /// Slots that produce an [`crate::customization::OriginOffset`] instead of geometry.
    pub fn is_origin(self) -> bool {
        matches!(
            self,
            Self::LeftItemOrigin
                | Self::RightItemOrigin
                | Self::LeftWingOrigin
                | Self::RightWingOrigin
                | Self::LeftShoulderOrigin
                | Self::RightShoulderOrigin
                | Self::LeftSpyglass
                | Self::RightSpyglass
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "Model",
            Self::Head => "Head",
            Self::LeftArm => "LeftArm",
            Self::RightArm => "RightArm",
            Self::LeftLeg => "LeftLeg",
            Self::RightLeg => "RightLeg",
            Self::Torso => "Torso",
            Self::World => "WORLD",
            Self::LeftItemOrigin => "LeftItemOrigin",
            Self::RightItemOrigin => "RightItemOrigin",
            Self::LeftWingOrigin => "LeftElytraOrigin",
            Self::RightWingOrigin => "RightElytraOrigin",
            Self::LeftShoulderOrigin => "LeftParrotOrigin",
            Self::RightShoulderOrigin => "RightParrotOrigin",
            Self::LeftWing => "LeftElytra",
            Self::RightWing => "RightElytra",
            Self::LeftSpyglass => "LeftSpyglass",
            Self::RightSpyglass => "RightSpyglass",
            Self::Camera => "Camera",
            Self::Skull => "Skull",
            Self::Hud => "Hud",
        }
    }

    /// Lenient parse used by the loader.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            log::warn!("Unknown attachment point {:?}, falling back to Model", value);
            Self::Model
        })
    }
}

impl FromStr for AttachmentPoint {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|point| point.name() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The six body joints of the host skeleton that can be queried for a live pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Joint {
    Head,
    Torso,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

/// Euler convention used to interpret a node's authored rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationConvention {
    /// Authoring-tool space: Z, then -Y, then -X.
    #[default]
    Tool,
    /// Host space: Z, then Y, then X.
    Host,
}

impl RotationConvention {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "BlockBench" => Self::Tool,
            "Vanilla" => Self::Host,
            other => {
                log::warn!("Unknown rotation type {:?}, falling back to BlockBench", other);
                Self::Tool
            }
        }
    }
}

bitflags! {
    /// Overlay shaders a node (and, through inheritance, its subtree) is drawn with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderFlags: u8 {
        const PORTAL = 1 << 0;
        const GLINT = 1 << 1;
    }
}

impl Default for ShaderFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl ShaderFlags {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "None" => Self::empty(),
            "EndPortal" => Self::PORTAL,
            "Glint" => Self::GLINT,
            other => {
                log::warn!("Unknown shader type {:?}, falling back to None", other);
                Self::empty()
            }
        }
    }
}

/// Where a node's texture comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureKind {
    #[default]
    Custom,
    Skin,
    Cape,
    Elytra,
    Resource,
}

impl TextureKind {
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "Custom" => Self::Custom,
            "Skin" => Self::Skin,
            "Cape" => Self::Cape,
            "Elytra" => Self::Elytra,
            "Resource" => Self::Resource,
            other => {
                log::warn!("Unknown texture type {:?}, falling back to Custom", other);
                Self::Custom
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant {:?}", self.0)
    }
}

impl std::error::Error for UnknownVariant {}
