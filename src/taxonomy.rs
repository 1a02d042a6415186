//! PPE detection class taxonomy.
//!
//! The detector emits numeric class ids. This module is the single place
//! those ids gain meaning:
//!
//! - `PpeClass`: the closed set of classes the model was trained on
//! - violation classes (`no_*`): detections that directly assert a missing item
//! - the person class, which drives the frame-wide vest check
//!
//! Ids outside the taxonomy are a model/config mismatch and MUST fail with
//! `UnknownClassError`; silently skipping them would corrupt compliance
//! semantics downstream.

use anyhow::Result;

/// Classes emitted by the PPE detection model, keyed by training id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PpeClass {
    Helmet,
    Gloves,
    Vest,
    Boots,
    Goggles,
    None,
    Person,
    NoHelmet,
    NoGoggle,
    NoGloves,
    NoBoots,
}

impl PpeClass {
    /// Resolve a raw model class id. Ids outside the taxonomy are an error.
    pub fn from_id(class_id: u32) -> Result<Self, UnknownClassError> {
        match class_id {
            0 => Ok(PpeClass::Helmet),
            1 => Ok(PpeClass::Gloves),
            2 => Ok(PpeClass::Vest),
            3 => Ok(PpeClass::Boots),
            4 => Ok(PpeClass::Goggles),
            5 => Ok(PpeClass::None),
            6 => Ok(PpeClass::Person),
            7 => Ok(PpeClass::NoHelmet),
            8 => Ok(PpeClass::NoGoggle),
            9 => Ok(PpeClass::NoGloves),
            10 => Ok(PpeClass::NoBoots),
            other => Err(UnknownClassError { class_id: other }),
        }
    }

    /// Training id for this class.
    pub fn id(&self) -> u32 {
        match self {
            PpeClass::Helmet => 0,
            PpeClass::Gloves => 1,
            PpeClass::Vest => 2,
            PpeClass::Boots => 3,
            PpeClass::Goggles => 4,
            PpeClass::None => 5,
            PpeClass::Person => 6,
            PpeClass::NoHelmet => 7,
            PpeClass::NoGoggle => 8,
            PpeClass::NoGloves => 9,
            PpeClass::NoBoots => 10,
        }
    }

    /// Label as produced by the training run. Casing is uneven ("Person")
    /// and "no_goggle" is singular; both appear verbatim in overlays and logs.
    pub fn label(&self) -> &'static str {
        match self {
            PpeClass::Helmet => "helmet",
            PpeClass::Gloves => "gloves",
            PpeClass::Vest => "vest",
            PpeClass::Boots => "boots",
            PpeClass::Goggles => "goggles",
            PpeClass::None => "none",
            PpeClass::Person => "Person",
            PpeClass::NoHelmet => "no_helmet",
            PpeClass::NoGoggle => "no_goggle",
            PpeClass::NoGloves => "no_gloves",
            PpeClass::NoBoots => "no_boots",
        }
    }

    /// True for classes that directly assert a missing item.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            PpeClass::NoHelmet | PpeClass::NoGoggle | PpeClass::NoGloves | PpeClass::NoBoots
        )
    }

    /// The item a violation class asserts as missing. `None` for
    /// non-violation classes.
    pub fn missing_item(&self) -> Option<MissingItem> {
        match self {
            PpeClass::NoHelmet => Some(MissingItem::Helmet),
            PpeClass::NoGoggle => Some(MissingItem::Goggles),
            PpeClass::NoGloves => Some(MissingItem::Gloves),
            PpeClass::NoBoots => Some(MissingItem::Boots),
            _ => None,
        }
    }
}

/// An item of required equipment found to be missing.
///
/// `VestHarness` is never produced by a violation class; it comes from the
/// frame-wide vest presence check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MissingItem {
    Helmet,
    Goggles,
    Gloves,
    Boots,
    VestHarness,
}

impl MissingItem {
    /// Name used in verdicts, alert log lines, and the summary report.
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingItem::Helmet => "helmet",
            MissingItem::Goggles => "goggles",
            MissingItem::Gloves => "gloves",
            MissingItem::Boots => "boots",
            MissingItem::VestHarness => "vest/harness",
        }
    }
}

impl std::fmt::Display for MissingItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join missing items with ", " for human-facing output.
pub fn join_items(items: &[MissingItem]) -> String {
    items
        .iter()
        .map(|item| item.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A detection referenced a class id the taxonomy does not define.
///
/// Fatal by policy: the model and the taxonomy are out of sync, and any
/// verdict produced under that mismatch would be untrustworthy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnknownClassError {
    pub class_id: u32,
}

impl std::fmt::Display for UnknownClassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "detection class id {} is not in the taxonomy (known ids 0..=10)",
            self.class_id
        )
    }
}
impl std::error::Error for UnknownClassError {}
