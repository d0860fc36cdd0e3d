// https://www.usb.org/document-library/video-class-v15-document-set
// https://github.com/torvalds/linux/blob/master/include/uapi/linux/usb/video.h
pub const VIDEO_INTERFACE_CLASS: u8 = 0x0E;
pub const VIDEO_CONTROL_SUBCLASS: u8 = 0x01;
pub const VIDEO_CONTROL_INTERFACE_NUMBER: u8 = 0x00;
pub const HUB_DEVICE_CLASS: u8 = 0x09;

pub const CS_INTERFACE_DESCRIPTOR_TYPE: u8 = 0x24;
pub const VC_INPUT_TERMINAL: u8 = 0x02;
pub const VC_PROCESSING_UNIT: u8 = 0x05;

pub const DESCRIPTOR_MIN_LENGTH: u8 = 3;
pub const CAMERA_TERMINAL_LENGTH: u8 = 0x12;

/// bControlSize of the Camera Terminal descriptor. bmControls follows it.
pub const CAMERA_TERMINAL_CONTROL_SIZE_OFFSET: usize = 14;
/// bControlSize of the Processing Unit descriptor. bmControls follows it.
pub const PROCESSING_UNIT_CONTROL_SIZE_OFFSET: usize = 7;

pub const CONTROL_TABLE_LENGTH: usize = 24;
