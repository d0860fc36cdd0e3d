/// bmControls unpacked one flag per control, most significant bit of each
/// byte first, bytes in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlBits(Vec<bool>);

impl ControlBits {
  pub fn unpack(bytes: &[u8]) -> Self {
    ControlBits(
      bytes
        .iter()
        .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1 == 1))
        .collect(),
    )
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Positions past the end of the bitmap read as unsupported.
  pub fn get(&self, position: usize) -> bool {
    self.0.get(position).copied().unwrap_or(false)
  }

  pub fn as_slice(&self) -> &[bool] {
    &self.0
  }
}

impl From<&[u8]> for ControlBits {
  fn from(bytes: &[u8]) -> Self {
    ControlBits::unpack(bytes)
  }
}
