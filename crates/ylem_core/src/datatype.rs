//! # Type Tags
//!
//! Every managed type is identified by a dense integer tag. The registry
//! uses the tag as its lookup key and every handle records the tag of the
//! allocator that owns it.

use std::fmt;
use std::str::FromStr;

use crate::error::MemoryError;

/// Opaque registry key for one managed type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TypeTag(pub u32);

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Datatype> for TypeTag {
    #[inline]
    fn from(datatype: Datatype) -> Self {
        Self(datatype as u32)
    }
}

/// The engine's managed object types.
///
/// `Universe` is the top-level simulation context and the usual root type
/// of a [`MemorySystem`](crate::MemorySystem).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Datatype {
    /// Top-level simulation context.
    Universe = 0,
    /// Console-settable variable.
    Variable,
    /// Callback engine.
    CallbackEngine,
    /// Callback object.
    CallbackObject,
    /// Callback parameter.
    CallbackParameter,
    /// Ecosystem (scene-independent species pool).
    Ecosystem,
    /// Scene.
    Scene,
    /// AI brain.
    Brain,
    /// Waypoint.
    Waypoint,
    /// Camera.
    Camera,
    /// Shader pipeline.
    Pipeline,
    /// Material.
    Material,
    /// Species (mesh template).
    Species,
    /// Object (species instance).
    Object,
    /// Symbiosis (multi-mesh model).
    Symbiosis,
    /// Symbiont material.
    SymbiontMaterial,
    /// Symbiont species.
    SymbiontSpecies,
    /// Holobiont (symbiosis instance).
    Holobiont,
    /// Biont (part of a holobiont).
    Biont,
    /// Shapeshifter transformation.
    ShapeshifterTransformation,
    /// Shapeshifter sequence.
    ShapeshifterSequence,
    /// Shapeshifter form.
    ShapeshifterForm,
    /// Shapeshifter.
    Shapeshifter,
    /// 2D font.
    Font2d,
    /// 2D text.
    Text2d,
    /// Vector font.
    VectorFont,
    /// Glyph.
    Glyph,
    /// 3D text.
    Text3d,
    /// Glyph object.
    GlyphObject,
    /// Input mode.
    InputMode,
    /// Audio track.
    AudioTrack,
    /// Console.
    Console,
    /// Console callback engine.
    ConsoleCallbackEngine,
    /// Console callback object.
    ConsoleCallbackObject,
    /// Console callback parameter.
    ConsoleCallbackParameter,
    /// Compute task.
    ComputeTask,
    /// Lisp function.
    LispFunction,
    /// Lisp function overload (polymorphic, boxed storage).
    GenericLispFunctionOverload,
}

impl Datatype {
    /// All datatypes in tag order.
    pub const ALL: [Self; 38] = [
        Self::Universe,
        Self::Variable,
        Self::CallbackEngine,
        Self::CallbackObject,
        Self::CallbackParameter,
        Self::Ecosystem,
        Self::Scene,
        Self::Brain,
        Self::Waypoint,
        Self::Camera,
        Self::Pipeline,
        Self::Material,
        Self::Species,
        Self::Object,
        Self::Symbiosis,
        Self::SymbiontMaterial,
        Self::SymbiontSpecies,
        Self::Holobiont,
        Self::Biont,
        Self::ShapeshifterTransformation,
        Self::ShapeshifterSequence,
        Self::ShapeshifterForm,
        Self::Shapeshifter,
        Self::Font2d,
        Self::Text2d,
        Self::VectorFont,
        Self::Glyph,
        Self::Text3d,
        Self::GlyphObject,
        Self::InputMode,
        Self::AudioTrack,
        Self::Console,
        Self::ConsoleCallbackEngine,
        Self::ConsoleCallbackObject,
        Self::ConsoleCallbackParameter,
        Self::ComputeTask,
        Self::LispFunction,
        Self::GenericLispFunctionOverload,
    ];

    /// The snake_case name used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Universe => "universe",
            Self::Variable => "variable",
            Self::CallbackEngine => "callback_engine",
            Self::CallbackObject => "callback_object",
            Self::CallbackParameter => "callback_parameter",
            Self::Ecosystem => "ecosystem",
            Self::Scene => "scene",
            Self::Brain => "brain",
            Self::Waypoint => "waypoint",
            Self::Camera => "camera",
            Self::Pipeline => "pipeline",
            Self::Material => "material",
            Self::Species => "species",
            Self::Object => "object",
            Self::Symbiosis => "symbiosis",
            Self::SymbiontMaterial => "symbiont_material",
            Self::SymbiontSpecies => "symbiont_species",
            Self::Holobiont => "holobiont",
            Self::Biont => "biont",
            Self::ShapeshifterTransformation => "shapeshifter_transformation",
            Self::ShapeshifterSequence => "shapeshifter_sequence",
            Self::ShapeshifterForm => "shapeshifter_form",
            Self::Shapeshifter => "shapeshifter",
            Self::Font2d => "font_2d",
            Self::Text2d => "text_2d",
            Self::VectorFont => "vector_font",
            Self::Glyph => "glyph",
            Self::Text3d => "text_3d",
            Self::GlyphObject => "glyph_object",
            Self::InputMode => "input_mode",
            Self::AudioTrack => "audio_track",
            Self::Console => "console",
            Self::ConsoleCallbackEngine => "console_callback_engine",
            Self::ConsoleCallbackObject => "console_callback_object",
            Self::ConsoleCallbackParameter => "console_callback_parameter",
            Self::ComputeTask => "compute_task",
            Self::LispFunction => "lisp_function",
            Self::GenericLispFunctionOverload => "generic_lisp_function_overload",
        }
    }

    /// Default number of instances per storage for this type.
    #[must_use]
    pub const fn default_capacity(self) -> u32 {
        match self {
            Self::Universe => 1,
            Self::Variable => 4096,
            Self::Ecosystem | Self::Brain => 16,
            Self::Biont
            | Self::ShapeshifterTransformation
            | Self::ShapeshifterSequence
            | Self::ShapeshifterForm => 1024,
            _ => 256,
        }
    }

    /// Looks up the datatype for a tag.
    #[must_use]
    pub fn from_tag(tag: TypeTag) -> Option<Self> {
        Self::ALL.get(tag.0 as usize).copied()
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Datatype {
    type Err = MemoryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|datatype| datatype.name() == name)
            .ok_or_else(|| MemoryError::InvalidConfig(format!("unknown datatype: {name}")))
    }
}
