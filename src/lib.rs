use log::debug;
#[cfg(feature = "libusb")]
use log::warn;
#[cfg(feature = "libusb")]
use serde::Serialize;

#[cfg(feature = "libusb")]
use rusb::UsbContext;

#[cfg(feature = "libusb")]
use core::convert::TryFrom;

#[cfg(feature = "libusb")]
pub use rusb;

pub mod backend;
pub mod bitmap;
pub mod constants;
pub mod controls;
pub mod descriptors;
pub mod registry;

pub use crate::backend::find_video_control_interface;
pub use crate::backend::InterfaceSource;
pub use crate::backend::InterfaceSummary;
pub use crate::controls::CapabilitySet;
pub use crate::descriptors::DescriptorKind;
pub use crate::descriptors::VideoControlDescriptors;
pub use crate::registry::builtin_registry;
pub use crate::registry::ImplementedRegistry;

#[cfg(feature = "libusb")]
use crate::constants::HUB_DEVICE_CLASS;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
  #[cfg(feature = "libusb")]
  Usb(rusb::Error),
  Io(std::io::Error),
  /// No interface 0 of class Video / subclass Video Control.
  InterfaceNotFound,
  /// No device matched the requested vendor and product id.
  DeviceNotFound,
  InvalidDeviceId(String),
  MalformedDescriptor {
    offset: usize,
    length: u8,
  },
  TruncatedBitmap {
    offset: usize,
    needed: usize,
    available: usize,
  },
  DescriptorNotFound(DescriptorKind),
  InvalidRegistry {
    line: usize,
    name: String,
  },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "libusb")]
impl From<rusb::Error> for Error {
  fn from(err: rusb::Error) -> Self {
    Self::Usb(err)
  }
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    Self::Io(err)
  }
}

impl std::fmt::Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      #[cfg(feature = "libusb")]
      Error::Usb(err) => write!(f, "usb: {}", err),
      Error::Io(err) => write!(f, "io: {}", err),
      Error::InterfaceNotFound => {
        f.write_str("video control interface not found")
      }
      Error::DeviceNotFound => f.write_str("device not found"),
      Error::InvalidDeviceId(id) => {
        write!(f, "invalid device id {:?}, expected VID:PID in hex", id)
      }
      Error::MalformedDescriptor { offset, length } => write!(
        f,
        "malformed descriptor at offset {}: bLength {}",
        offset, length
      ),
      Error::TruncatedBitmap {
        offset,
        needed,
        available,
      } => write!(
        f,
        "truncated bmControls at offset {}: needs {} bytes, has {}",
        offset, needed, available
      ),
      Error::DescriptorNotFound(kind) => {
        write!(f, "{} descriptor not found", kind)
      }
      Error::InvalidRegistry { line, name } => {
        write!(f, "unknown capability {:?} on registry line {}", name, line)
      }
    }
  }
}

impl std::error::Error for Error {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      #[cfg(feature = "libusb")]
      Error::Usb(err) => Some(err),
      Error::Io(err) => Some(err),
      _ => None,
    }
  }
}

/// Every capability the hardware declares in the Video Control extra bytes,
/// camera terminal controls first.
pub fn declared_capabilities(extra: &[u8]) -> Result<CapabilitySet> {
  Ok(VideoControlDescriptors::parse(extra)?.declared())
}

/// Declared capabilities narrowed to the ones `registry` implements, unless
/// `list_all` is set. Any parse error fails the whole call.
pub fn resolve<R>(
  extra: &[u8],
  registry: &R,
  list_all: bool,
) -> Result<CapabilitySet>
where
  R: ImplementedRegistry + ?Sized,
{
  let declared = declared_capabilities(extra)?;
  debug!("declared capabilities: {:?}", declared.as_slice());
  Ok(registry::filter(declared, registry, list_all))
}

/// A device exposing a Video Control interface.
#[cfg(feature = "libusb")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UvcDevice {
  pub vendor_id: u16,
  pub product_id: u16,
  pub bus_number: u8,
  pub address: u8,
  pub manufacturer_name: Option<String>,
  pub product_name: Option<String>,
  pub video_control: InterfaceSummary,
  #[serde(skip)]
  device: rusb::Device<rusb::Context>,
}

#[cfg(feature = "libusb")]
impl UvcDevice {
  /// The Video Control extra bytes, as read from the active configuration.
  pub fn extra(&self) -> &[u8] {
    &self.video_control.extra
  }

  pub fn descriptors(&self) -> Result<VideoControlDescriptors> {
    VideoControlDescriptors::parse(self.extra())
  }

  pub fn capabilities<R>(
    &self,
    registry: &R,
    list_all: bool,
  ) -> Result<CapabilitySet>
  where
    R: ImplementedRegistry + ?Sized,
  {
    resolve(self.extra(), registry, list_all)
  }

  pub fn device(&self) -> &rusb::Device<rusb::Context> {
    &self.device
  }
}

#[cfg(feature = "libusb")]
impl TryFrom<rusb::Device<rusb::Context>> for UvcDevice {
  type Error = Error;

  fn try_from(device: rusb::Device<rusb::Context>) -> Result<UvcDevice> {
    let device_descriptor = device.device_descriptor()?;
    let config_descriptor = device.active_config_descriptor()?;
    let video_control = find_video_control_interface(&config_descriptor)?;

    // Descriptors come from the cached configuration. Strings need a handle,
    // which may be denied without affecting the capability list.
    let (manufacturer_name, product_name) = match device.open() {
      Ok(handle) => (
        handle
          .read_manufacturer_string_ascii(&device_descriptor)
          .ok(),
        handle.read_product_string_ascii(&device_descriptor).ok(),
      ),
      Err(err) => {
        debug!(
          "{:04x}:{:04x}: not reading strings: {}",
          device_descriptor.vendor_id(),
          device_descriptor.product_id(),
          err
        );
        (None, None)
      }
    };

    Ok(UvcDevice {
      vendor_id: device_descriptor.vendor_id(),
      product_id: device_descriptor.product_id(),
      bus_number: device.bus_number(),
      address: device.address(),
      manufacturer_name,
      product_name,
      video_control,
      device,
    })
  }
}

/// A libusb context. Provides APIs for camera enumeration.
#[cfg(feature = "libusb")]
pub struct Context(rusb::Context);

#[cfg(feature = "libusb")]
impl Context {
  pub fn new() -> Result<Self> {
    let ctx = rusb::Context::new()?;
    Ok(Self(ctx))
  }

  /// Every attached device with a Video Control interface. Devices that
  /// cannot be inspected are skipped.
  pub fn cameras(&self) -> Result<Vec<UvcDevice>> {
    let devices = self.0.devices()?;

    let mut cameras = vec![];
    for device in devices.iter() {
      // Do not list hubs.
      match device.device_descriptor() {
        Ok(d) if d.class_code() != HUB_DEVICE_CLASS => {}
        _ => continue,
      }

      match UvcDevice::try_from(device) {
        Ok(camera) => cameras.push(camera),
        Err(Error::InterfaceNotFound) => {}
        Err(err) => warn!("skipping device: {}", err),
      }
    }
    Ok(cameras)
  }

  pub fn find(&self, vendor_id: u16, product_id: u16) -> Result<UvcDevice> {
    self
      .cameras()?
      .into_iter()
      .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
      .ok_or(Error::DeviceNotFound)
  }
}

/// Parses `VID:PID` in hex, e.g. `046d:082d`.
pub fn parse_device_id(id: &str) -> Result<(u16, u16)> {
  let invalid = || Error::InvalidDeviceId(id.to_string());
  let mut parts = id.splitn(2, ':');
  let vendor = parts.next().ok_or_else(invalid)?;
  let product = parts.next().ok_or_else(invalid)?;
  let vendor_id = u16::from_str_radix(vendor, 16).map_err(|_| invalid())?;
  let product_id = u16::from_str_radix(product, 16).map_err(|_| invalid())?;
  Ok((vendor_id, product_id))
}
