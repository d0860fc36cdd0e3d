use std::collections::BTreeSet;
use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::controls::CapabilitySet;
use crate::controls::INPUT_TERMINAL_CONTROLS;
use crate::controls::PROCESSING_UNIT_CONTROLS;
use crate::Error;
use crate::Result;

/// Capability names a control layer knows how to get and set.
pub trait ImplementedRegistry {
  fn implements(&self, name: &str) -> bool;
}

impl<T: ImplementedRegistry + ?Sized> ImplementedRegistry for &T {
  fn implements(&self, name: &str) -> bool {
    (**self).implements(name)
  }
}

impl ImplementedRegistry for HashSet<String> {
  fn implements(&self, name: &str) -> bool {
    self.contains(name)
  }
}

impl<'a> ImplementedRegistry for HashSet<&'a str> {
  fn implements(&self, name: &str) -> bool {
    self.contains(name)
  }
}

impl ImplementedRegistry for BTreeSet<String> {
  fn implements(&self, name: &str) -> bool {
    self.contains(name)
  }
}

impl<'a> ImplementedRegistry for [&'a str] {
  fn implements(&self, name: &str) -> bool {
    self.iter().any(|n| *n == name)
  }
}

impl ImplementedRegistry for Vec<String> {
  fn implements(&self, name: &str) -> bool {
    self.iter().any(|n| n == name)
  }
}

static BUILTIN: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  [
    "autoExposureMode",
    "autoExposurePriority",
    "absoluteExposureTime",
    "absoluteFocus",
    "autoFocus",
    "absoluteZoom",
    "absolutePanTilt",
    "brightness",
    "contrast",
    "saturation",
    "sharpness",
    "whiteBalance",
    "autoWhiteBalance",
    "backlightCompensation",
    "gain",
    "powerLineFrequency",
  ]
  .iter()
  .copied()
  .collect()
});

/// Controls the bundled get/set layer implements.
pub fn builtin_registry() -> &'static HashSet<&'static str> {
  &BUILTIN
}

fn is_known(name: &str) -> bool {
  INPUT_TERMINAL_CONTROLS.contains(name)
    || PROCESSING_UNIT_CONTROLS.contains(name)
}

/// Reads a registry with one capability name per line. Blank lines and
/// anything after `#` are skipped.
pub fn registry_from_str(text: &str) -> Result<BTreeSet<String>> {
  let mut registry = BTreeSet::new();

  for (idx, line) in text.lines().enumerate() {
    let name = match line.find('#') {
      Some(pos) => &line[..pos],
      None => line,
    }
    .trim();

    if name.is_empty() {
      continue;
    }

    if !is_known(name) {
      return Err(Error::InvalidRegistry {
        line: idx + 1,
        name: name.to_string(),
      });
    }

    registry.insert(name.to_string());
  }

  Ok(registry)
}

/// Keeps the declared names the registry implements, in declared order.
/// `list_all` returns `declared` untouched.
pub fn filter<R>(
  declared: CapabilitySet,
  registry: &R,
  list_all: bool,
) -> CapabilitySet
where
  R: ImplementedRegistry + ?Sized,
{
  if list_all {
    return declared;
  }

  declared.retain(|name| registry.implements(name))
}
