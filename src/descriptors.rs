use std::iter::FusedIterator;

use log::debug;
use log::trace;
use serde::Serialize;

use crate::bitmap::ControlBits;
use crate::constants::*;
use crate::controls::CapabilitySet;
use crate::controls::INPUT_TERMINAL_CONTROLS;
use crate::controls::PROCESSING_UNIT_CONTROLS;
use crate::Error;
use crate::Result;

macro_rules! bail_if {
  ($e: expr, $err: expr) => {
    if $e {
      return Err($err);
    }
  };
}

/// One length-prefixed class-specific descriptor, borrowed from the
/// interface's extra bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRecord<'a> {
  offset: usize,
  bytes: &'a [u8],
}

impl<'a> DescriptorRecord<'a> {
  /// Position of the record's bLength byte in the source buffer.
  pub fn offset(&self) -> usize {
    self.offset
  }

  // bLength
  pub fn length(&self) -> u8 {
    self.bytes[0]
  }

  // bDescriptorType
  pub fn descriptor_type(&self) -> u8 {
    self.bytes[1]
  }

  // bDescriptorSubtype
  pub fn descriptor_subtype(&self) -> u8 {
    self.bytes[2]
  }

  /// Everything after the three header bytes.
  pub fn body(&self) -> &'a [u8] {
    &self.bytes[3..]
  }

  pub fn as_bytes(&self) -> &'a [u8] {
    self.bytes
  }

  pub fn kind(&self) -> DescriptorKind {
    classify(self)
  }

  /// Returns bmControls for a Camera Terminal or Processing Unit record,
  /// `None` for every other record.
  pub fn control_bitmap(&self) -> Result<Option<&'a [u8]>> {
    let size_offset = match self.kind().control_size_offset() {
      Some(offset) => offset,
      None => return Ok(None),
    };

    let available = self.bytes.len();
    // bControlSize itself is missing
    bail_if!(
      available <= size_offset,
      Error::TruncatedBitmap {
        offset: self.offset,
        needed: size_offset + 1,
        available,
      }
    );

    let start = size_offset + 1;
    let end = start + self.bytes[size_offset] as usize;
    bail_if!(
      available < end,
      Error::TruncatedBitmap {
        offset: self.offset,
        needed: end,
        available,
      }
    );

    Ok(Some(&self.bytes[start..end]))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DescriptorKind {
  CameraTerminal,
  ProcessingUnit,
  Unclassified,
}

impl DescriptorKind {
  fn control_size_offset(self) -> Option<usize> {
    match self {
      DescriptorKind::CameraTerminal => {
        Some(CAMERA_TERMINAL_CONTROL_SIZE_OFFSET)
      }
      DescriptorKind::ProcessingUnit => {
        Some(PROCESSING_UNIT_CONTROL_SIZE_OFFSET)
      }
      DescriptorKind::Unclassified => None,
    }
  }
}

impl std::fmt::Display for DescriptorKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      DescriptorKind::CameraTerminal => "camera terminal",
      DescriptorKind::ProcessingUnit => "processing unit",
      DescriptorKind::Unclassified => "unclassified",
    };
    f.write_str(name)
  }
}

// Camera Terminals are matched on their full length. Processing Units carry
// a variable-width bmControls, so only the tags are compared.
pub fn classify(record: &DescriptorRecord<'_>) -> DescriptorKind {
  if record.descriptor_type() != CS_INTERFACE_DESCRIPTOR_TYPE {
    return DescriptorKind::Unclassified;
  }

  match record.descriptor_subtype() {
    VC_INPUT_TERMINAL if record.length() == CAMERA_TERMINAL_LENGTH => {
      DescriptorKind::CameraTerminal
    }
    VC_PROCESSING_UNIT => DescriptorKind::ProcessingUnit,
    _ => DescriptorKind::Unclassified,
  }
}

/// Lazily splits a buffer into its length-prefixed records.
///
/// The iterator yields at most one error and is exhausted afterwards. Clone
/// it (or call [`descriptors`] again) to walk the same buffer twice.
#[derive(Debug, Clone)]
pub struct Descriptors<'a> {
  bytes: &'a [u8],
  cursor: usize,
}

pub fn descriptors(bytes: &[u8]) -> Descriptors<'_> {
  Descriptors { bytes, cursor: 0 }
}

impl<'a> Iterator for Descriptors<'a> {
  type Item = Result<DescriptorRecord<'a>>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.cursor >= self.bytes.len() {
      return None;
    }

    let offset = self.cursor;
    let length = self.bytes[offset];
    let end = offset + length as usize;

    if length < DESCRIPTOR_MIN_LENGTH || end > self.bytes.len() {
      self.cursor = self.bytes.len();
      return Some(Err(Error::MalformedDescriptor { offset, length }));
    }

    self.cursor = end;
    let record = DescriptorRecord {
      offset,
      bytes: &self.bytes[offset..end],
    };
    trace!(
      "descriptor at {}: bLength={} type={:#04x} subtype={:#04x}",
      offset,
      length,
      record.descriptor_type(),
      record.descriptor_subtype()
    );
    Some(Ok(record))
  }
}

impl FusedIterator for Descriptors<'_> {}

// Table 3-6 Camera Terminal Descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraTerminal {
  pub terminal_id: u8,
  pub terminal_type: u16,
  pub control_size: u8,
  pub controls: Vec<u8>,
}

impl CameraTerminal {
  fn from_record(record: &DescriptorRecord<'_>, controls: &[u8]) -> Self {
    let bytes = record.as_bytes();
    CameraTerminal {
      terminal_id: bytes[3],
      terminal_type: u16::from_le_bytes([bytes[4], bytes[5]]),
      control_size: controls.len() as u8,
      controls: controls.to_vec(),
    }
  }

  pub fn bits(&self) -> ControlBits {
    ControlBits::unpack(&self.controls)
  }

  pub fn capabilities(&self) -> CapabilitySet {
    INPUT_TERMINAL_CONTROLS.map(&self.bits())
  }
}

// Table 3-8 Processing Unit Descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingUnit {
  pub unit_id: u8,
  pub source_id: u8,
  pub max_multiplier: u16,
  pub control_size: u8,
  pub controls: Vec<u8>,
}

impl ProcessingUnit {
  fn from_record(record: &DescriptorRecord<'_>, controls: &[u8]) -> Self {
    let bytes = record.as_bytes();
    ProcessingUnit {
      unit_id: bytes[3],
      source_id: bytes[4],
      max_multiplier: u16::from_le_bytes([bytes[5], bytes[6]]),
      control_size: controls.len() as u8,
      controls: controls.to_vec(),
    }
  }

  pub fn bits(&self) -> ControlBits {
    ControlBits::unpack(&self.controls)
  }

  pub fn capabilities(&self) -> CapabilitySet {
    PROCESSING_UNIT_CONTROLS.map(&self.bits())
  }
}

/// The two descriptors of a Video Control interface that carry capability
/// bitmaps. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoControlDescriptors {
  pub camera_terminal: Option<CameraTerminal>,
  pub processing_unit: Option<ProcessingUnit>,
}

impl VideoControlDescriptors {
  /// Walks the whole buffer. Any malformed or truncated record fails the
  /// parse, including records of a kind that was already found.
  pub fn parse(extra: &[u8]) -> Result<Self> {
    let mut parsed = VideoControlDescriptors::default();

    for record in descriptors(extra) {
      let record = record?;
      let controls = match record.control_bitmap()? {
        Some(controls) => controls,
        None => continue,
      };

      match record.kind() {
        DescriptorKind::CameraTerminal if parsed.camera_terminal.is_none() => {
          debug!(
            "camera terminal at {}: bmControls={:02x?}",
            record.offset(),
            controls
          );
          parsed.camera_terminal =
            Some(CameraTerminal::from_record(&record, controls));
        }
        DescriptorKind::ProcessingUnit if parsed.processing_unit.is_none() => {
          debug!(
            "processing unit at {}: bmControls={:02x?}",
            record.offset(),
            controls
          );
          parsed.processing_unit =
            Some(ProcessingUnit::from_record(&record, controls));
        }
        kind => {
          debug!("ignoring additional {} at {}", kind, record.offset());
        }
      }
    }

    Ok(parsed)
  }

  pub fn camera_terminal(&self) -> Result<&CameraTerminal> {
    self
      .camera_terminal
      .as_ref()
      .ok_or(Error::DescriptorNotFound(DescriptorKind::CameraTerminal))
  }

  pub fn processing_unit(&self) -> Result<&ProcessingUnit> {
    self
      .processing_unit
      .as_ref()
      .ok_or(Error::DescriptorNotFound(DescriptorKind::ProcessingUnit))
  }

  /// Input Terminal capabilities followed by Processing Unit capabilities.
  /// A missing descriptor contributes nothing.
  pub fn declared(&self) -> CapabilitySet {
    let terminal = self
      .camera_terminal
      .as_ref()
      .map(CameraTerminal::capabilities)
      .unwrap_or_default();
    let unit = self
      .processing_unit
      .as_ref()
      .map(ProcessingUnit::capabilities)
      .unwrap_or_default();
    terminal.chain(unit)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  // Video Control interface header, UVC 1.0.
  pub(crate) const HEADER: [u8; 13] = [
    0x0D, 0x24, 0x01, 0x00, 0x01, 0x4D, 0x00, 0x80, 0x8D, 0x5B, 0x00, 0x01,
    0x01,
  ];

  // Camera terminal, bControlSize 3.
  pub(crate) const CAMERA_TERMINAL: [u8; 18] = [
    0x12, 0x24, 0x02, 0x01, 0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x03, 0x70, 0x60, 0x40,
  ];

  // Processing unit, UVC 1.1 layout with a 3 byte bmControls.
  pub(crate) const PROCESSING_UNIT: [u8; 13] = [
    0x0D, 0x24, 0x05, 0x03, 0x01, 0x00, 0x40, 0x03, 0xD0, 0x40, 0x00, 0x00,
    0x00,
  ];

  pub(crate) const OUTPUT_TERMINAL: [u8; 9] =
    [0x09, 0x24, 0x03, 0x04, 0x01, 0x01, 0x00, 0x03, 0x00];

  pub(crate) const EXTENSION_UNIT: [u8; 27] = [
    0x1B, 0x24, 0x06, 0x06, 0x6A, 0xD1, 0x49, 0x2C, 0xB8, 0x32, 0x85, 0x44,
    0x3E, 0xA8, 0x64, 0x3A, 0x15, 0x23, 0x62, 0xF2, 0x08, 0x01, 0x03, 0x02,
    0xFF, 0xFF, 0x00,
  ];

  pub(crate) fn webcam() -> Vec<u8> {
    [
      &HEADER[..],
      &CAMERA_TERMINAL[..],
      &PROCESSING_UNIT[..],
      &EXTENSION_UNIT[..],
      &OUTPUT_TERMINAL[..],
    ]
    .concat()
  }

  #[test]
  fn test_descriptors_segments_exactly() -> crate::Result<()> {
    let bytes = webcam();
    let records = descriptors(&bytes).collect::<crate::Result<Vec<_>>>()?;

    let lengths: Vec<u8> = records.iter().map(|r| r.length()).collect();
    assert_eq!(lengths, vec![13, 18, 13, 27, 9]);

    let offsets: Vec<usize> = records.iter().map(|r| r.offset()).collect();
    assert_eq!(offsets, vec![0, 13, 31, 44, 71]);

    let rebuilt: Vec<u8> =
      records.iter().flat_map(|r| r.as_bytes().to_vec()).collect();
    assert_eq!(rebuilt, bytes);
    Ok(())
  }

  #[test]
  fn test_descriptors_is_restartable() {
    let bytes = webcam();
    let walker = descriptors(&bytes);
    assert_eq!(walker.clone().count(), 5);
    assert_eq!(walker.count(), 5);
  }

  #[test]
  fn test_record_accessors() -> crate::Result<()> {
    let record = descriptors(&OUTPUT_TERMINAL).next().unwrap()?;
    assert_eq!(record.length(), 9);
    assert_eq!(record.descriptor_type(), 0x24);
    assert_eq!(record.descriptor_subtype(), 0x03);
    assert_eq!(record.body(), &OUTPUT_TERMINAL[3..]);
    Ok(())
  }

  #[test]
  fn test_descriptors_empty_buffer() {
    assert_eq!(descriptors(&[]).count(), 0);
  }

  #[test]
  fn test_descriptors_zero_length() {
    let mut walker = descriptors(&[0x00, 0x24, 0x02]);
    assert!(matches!(
      walker.next(),
      Some(Err(Error::MalformedDescriptor {
        offset: 0,
        length: 0
      }))
    ));
    assert!(walker.next().is_none());
  }

  #[test]
  fn test_descriptors_short_length() {
    let bytes = [&OUTPUT_TERMINAL[..], &[0x02, 0x24][..]].concat();
    let results: Vec<_> = descriptors(&bytes).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(
      results[1],
      Err(Error::MalformedDescriptor {
        offset: 9,
        length: 2
      })
    ));
  }

  #[test]
  fn test_descriptors_final_record_overruns() {
    // The camera terminal claims 18 bytes but only 10 remain.
    let bytes = [&HEADER[..], &CAMERA_TERMINAL[..10]].concat();
    let results: Vec<_> = descriptors(&bytes).collect();
    assert_eq!(results.len(), 2);
    assert!(matches!(
      results[1],
      Err(Error::MalformedDescriptor {
        offset: 13,
        length: 0x12
      })
    ));
  }

  #[test]
  fn test_classify() -> crate::Result<()> {
    let bytes = webcam();
    let kinds = descriptors(&bytes)
      .map(|r| r.map(|r| r.kind()))
      .collect::<crate::Result<Vec<_>>>()?;
    assert_eq!(
      kinds,
      vec![
        DescriptorKind::Unclassified,
        DescriptorKind::CameraTerminal,
        DescriptorKind::ProcessingUnit,
        DescriptorKind::Unclassified,
        DescriptorKind::Unclassified,
      ]
    );
    Ok(())
  }

  #[test]
  fn test_classify_non_camera_input_terminal() -> crate::Result<()> {
    // Composite input terminal: same subtype, 8 bytes long.
    let bytes = [0x08, 0x24, 0x02, 0x02, 0x01, 0x04, 0x00, 0x00];
    let record = descriptors(&bytes).next().unwrap()?;
    assert_eq!(record.kind(), DescriptorKind::Unclassified);
    assert_eq!(record.control_bitmap()?, None);
    Ok(())
  }

  #[test]
  fn test_classify_processing_unit_any_length() -> crate::Result<()> {
    // UVC 1.0 processing unit: 11 bytes, 2 byte bmControls.
    let bytes =
      [0x0B, 0x24, 0x05, 0x02, 0x01, 0x00, 0x00, 0x02, 0x7F, 0x15, 0x00];
    let record = descriptors(&bytes).next().unwrap()?;
    assert_eq!(record.kind(), DescriptorKind::ProcessingUnit);
    assert_eq!(record.control_bitmap()?, Some(&[0x7F, 0x15][..]));

    let record = descriptors(&PROCESSING_UNIT).next().unwrap()?;
    assert_eq!(record.kind(), DescriptorKind::ProcessingUnit);
    assert_eq!(record.control_bitmap()?, Some(&[0xD0, 0x40, 0x00][..]));
    Ok(())
  }

  #[test]
  fn test_camera_terminal_bitmap() -> crate::Result<()> {
    let record = descriptors(&CAMERA_TERMINAL).next().unwrap()?;
    assert_eq!(record.control_bitmap()?, Some(&[0x70, 0x60, 0x40][..]));
    Ok(())
  }

  #[test]
  fn test_camera_terminal_bitmap_truncated() -> crate::Result<()> {
    let mut bytes = CAMERA_TERMINAL;
    // bControlSize 4 needs 19 bytes in an 18 byte record.
    bytes[14] = 0x04;
    let record = descriptors(&bytes).next().unwrap()?;
    assert!(matches!(
      record.control_bitmap(),
      Err(Error::TruncatedBitmap {
        offset: 0,
        needed: 19,
        available: 18
      })
    ));
    Ok(())
  }

  #[test]
  fn test_processing_unit_missing_control_size() -> crate::Result<()> {
    let bytes = [0x06, 0x24, 0x05, 0x02, 0x01, 0x00];
    let record = descriptors(&bytes).next().unwrap()?;
    assert!(matches!(
      record.control_bitmap(),
      Err(Error::TruncatedBitmap {
        offset: 0,
        needed: 8,
        available: 6
      })
    ));
    Ok(())
  }

  #[test]
  fn test_parse() -> crate::Result<()> {
    let parsed = VideoControlDescriptors::parse(&webcam())?;
    assert_eq!(
      parsed.camera_terminal,
      Some(CameraTerminal {
        terminal_id: 1,
        terminal_type: 0x0201,
        control_size: 3,
        controls: vec![0x70, 0x60, 0x40],
      })
    );
    assert_eq!(
      parsed.processing_unit,
      Some(ProcessingUnit {
        unit_id: 3,
        source_id: 1,
        max_multiplier: 0x4000,
        control_size: 3,
        controls: vec![0xD0, 0x40, 0x00],
      })
    );
    Ok(())
  }

  #[test]
  fn test_parse_declared() -> crate::Result<()> {
    let parsed = VideoControlDescriptors::parse(&webcam())?;
    assert_eq!(
      parsed.declared().as_slice(),
      &[
        "autoExposureMode",
        "autoExposurePriority",
        "absoluteExposureTime",
        "absoluteZoom",
        "relativeZoom",
        "autoFocus",
        "brightness",
        "contrast",
        "saturation",
        "gain",
      ]
    );
    Ok(())
  }

  #[test]
  fn test_parse_keeps_first_of_each_kind() -> crate::Result<()> {
    let mut second = CAMERA_TERMINAL;
    second[3] = 0x09;
    second[15] = 0xFF;
    let bytes = [&CAMERA_TERMINAL[..], &second[..]].concat();
    let parsed = VideoControlDescriptors::parse(&bytes)?;
    assert_eq!(parsed.camera_terminal()?.terminal_id, 1);
    Ok(())
  }

  #[test]
  fn test_parse_rejects_truncated_duplicate() {
    let mut second = PROCESSING_UNIT;
    second[7] = 0x08;
    let bytes = [&PROCESSING_UNIT[..], &second[..]].concat();
    assert!(matches!(
      VideoControlDescriptors::parse(&bytes),
      Err(Error::TruncatedBitmap { offset: 13, .. })
    ));
  }

  #[test]
  fn test_parse_without_capability_descriptors() -> crate::Result<()> {
    let bytes =
      [&HEADER[..], &EXTENSION_UNIT[..], &OUTPUT_TERMINAL[..]].concat();
    let parsed = VideoControlDescriptors::parse(&bytes)?;
    assert_eq!(parsed, VideoControlDescriptors::default());
    assert!(parsed.declared().is_empty());
    assert!(matches!(
      parsed.camera_terminal(),
      Err(Error::DescriptorNotFound(DescriptorKind::CameraTerminal))
    ));
    assert!(matches!(
      parsed.processing_unit(),
      Err(Error::DescriptorNotFound(DescriptorKind::ProcessingUnit))
    ));
    Ok(())
  }
}
