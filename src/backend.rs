use std::borrow::Cow;

use serde::Serialize;

use crate::constants::VIDEO_CONTROL_INTERFACE_NUMBER;
use crate::constants::VIDEO_CONTROL_SUBCLASS;
use crate::constants::VIDEO_INTERFACE_CLASS;
use crate::Error;
use crate::Result;

/// One alternate setting of one interface, with the class-specific bytes
/// libusb could not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceSummary {
  pub interface_number: u8,
  pub alternate_setting: u8,
  pub interface_class: u8,
  pub interface_subclass: u8,
  #[serde(skip)]
  pub extra: Vec<u8>,
}

impl InterfaceSummary {
  /// libusb reports no extra bytes as `None`; that reads as an empty buffer.
  pub fn from_fields(
    interface_number: u8,
    alternate_setting: u8,
    interface_class: u8,
    interface_subclass: u8,
    extra: Option<&[u8]>,
  ) -> Self {
    InterfaceSummary {
      interface_number,
      alternate_setting,
      interface_class,
      interface_subclass,
      extra: extra.map(<[u8]>::to_vec).unwrap_or_default(),
    }
  }

  pub fn is_video_control(&self) -> bool {
    self.interface_number == VIDEO_CONTROL_INTERFACE_NUMBER
      && self.interface_class == VIDEO_INTERFACE_CLASS
      && self.interface_subclass == VIDEO_CONTROL_SUBCLASS
  }
}

/// Anything that can describe a device's interfaces. Lets the parser run
/// against libusb, a captured dump, or nothing at all.
pub trait InterfaceSource {
  fn summaries(&self) -> Cow<'_, [InterfaceSummary]>;
}

impl InterfaceSource for [InterfaceSummary] {
  fn summaries(&self) -> Cow<'_, [InterfaceSummary]> {
    Cow::Borrowed(self)
  }
}

impl InterfaceSource for Vec<InterfaceSummary> {
  fn summaries(&self) -> Cow<'_, [InterfaceSummary]> {
    Cow::Borrowed(self.as_slice())
  }
}

#[cfg(feature = "libusb")]
impl InterfaceSource for rusb::ConfigDescriptor {
  fn summaries(&self) -> Cow<'_, [InterfaceSummary]> {
    let summaries = self
      .interfaces()
      .flat_map(|i| {
        i.descriptors()
          .map(|d| {
            InterfaceSummary::from_fields(
              d.interface_number(),
              d.setting_number(),
              d.class_code(),
              d.sub_class_code(),
              d.extra(),
            )
          })
          .collect::<Vec<_>>()
      })
      .collect::<Vec<_>>();
    Cow::Owned(summaries)
  }
}

pub fn find_video_control_interface<S>(source: &S) -> Result<InterfaceSummary>
where
  S: InterfaceSource + ?Sized,
{
  source
    .summaries()
    .iter()
    .find(|summary| summary.is_video_control())
    .cloned()
    .ok_or(Error::InterfaceNotFound)
}
