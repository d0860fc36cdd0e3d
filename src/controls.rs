use serde::Serialize;

use crate::bitmap::ControlBits;
use crate::constants::CONTROL_TABLE_LENGTH;

/// A bmControls position. Reserved positions never name a capability,
/// whatever the device sets them to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
  Control(&'static str),
  Reserved,
}

use Slot::Control;
use Slot::Reserved;

#[derive(Debug)]
pub struct ControlTable {
  slots: [Slot; CONTROL_TABLE_LENGTH],
}

// Table 3-6 Camera Terminal Descriptor, bmControls D0..D23
pub static INPUT_TERMINAL_CONTROLS: ControlTable = ControlTable {
  slots: [
    Control("scanningMode"),
    Control("autoExposureMode"),
    Control("autoExposurePriority"),
    Control("absoluteExposureTime"),
    Control("relativeExposureTime"),
    Control("absoluteFocus"),
    Control("relativeFocus"),
    Control("absoluteIris"),
    Control("relativeIris"),
    Control("absoluteZoom"),
    Control("relativeZoom"),
    Control("absolutePanTilt"),
    Control("relativePanTilt"),
    Control("absoluteRoll"),
    Control("relativeRoll"),
    Reserved,
    Reserved,
    Control("autoFocus"),
    Control("privacy"),
    Control("simpleFocus"),
    Control("window"),
    Control("regionOfInterest"),
    Reserved,
    Reserved,
  ],
};

// Table 3-8 Processing Unit Descriptor, bmControls D0..D23
pub static PROCESSING_UNIT_CONTROLS: ControlTable = ControlTable {
  slots: [
    Control("brightness"),
    Control("contrast"),
    Control("hue"),
    Control("saturation"),
    Control("sharpness"),
    Control("gamma"),
    Control("whiteBalance"),
    Control("whiteBalanceComponent"),
    Control("backlightCompensation"),
    Control("gain"),
    Control("powerLineFrequency"),
    Control("autoHue"),
    Control("autoWhiteBalance"),
    Control("autoWhiteBalanceComponent"),
    Control("digitalMultiplier"),
    Control("digitalMultiplierLimit"),
    Control("analogVideoStandard"),
    Control("analogVideoLockStatus"),
    Control("autoContrast"),
    Reserved,
    Reserved,
    Reserved,
    Reserved,
    Reserved,
  ],
};

impl ControlTable {
  pub fn slots(&self) -> &[Slot] {
    &self.slots
  }

  pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.slots.iter().filter_map(|slot| match slot {
      Control(name) => Some(*name),
      Reserved => None,
    })
  }

  pub fn contains(&self, name: &str) -> bool {
    self.names().any(|n| n == name)
  }

  /// Names of the set bits, in table order. Bits beyond the table are
  /// ignored, table positions beyond the bitmap count as unset.
  pub fn map(&self, bits: &ControlBits) -> CapabilitySet {
    CapabilitySet(
      self
        .slots
        .iter()
        .enumerate()
        .filter(|(position, _)| bits.get(*position))
        .filter_map(|(_, slot)| match slot {
          Control(name) => Some(*name),
          Reserved => None,
        })
        .collect(),
    )
  }
}

/// Ordered capability names. Built only from a table walk, so each name
/// appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilitySet(Vec<&'static str>);

impl CapabilitySet {
  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.iter().any(|n| *n == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.0.iter().copied()
  }

  pub fn as_slice(&self) -> &[&'static str] {
    &self.0
  }

  /// Appends `other`, keeping this set's names first.
  pub fn chain(mut self, other: CapabilitySet) -> Self {
    for name in other.0 {
      if !self.contains(name) {
        self.0.push(name);
      }
    }
    self
  }

  pub fn retain<F>(mut self, f: F) -> Self
  where
    F: FnMut(&&'static str) -> bool,
  {
    self.0.retain(f);
    self
  }

  pub fn into_vec(self) -> Vec<&'static str> {
    self.0
  }
}

impl IntoIterator for CapabilitySet {
  type Item = &'static str;
  type IntoIter = std::vec::IntoIter<&'static str>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.into_iter()
  }
}
