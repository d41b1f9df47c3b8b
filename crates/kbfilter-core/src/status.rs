// Kbfilter Status Codes
// Completion codes carried by control requests and hook calls

use std::fmt;

/// Completion status of a request or hook call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Success,
    /// A consumer is already connected
    SharingViolation,
    /// Payload missing, malformed, or too small
    InvalidParameter,
    /// The request kind is recognised but not supported
    NotImplemented,
    /// Generic failure reported by a lower layer
    Unsuccessful,
    /// Any other raw status value
    Other(u32),
}

impl Status {
    const RAW_SUCCESS: u32 = 0x0000_0000;
    const RAW_UNSUCCESSFUL: u32 = 0xC000_0001;
    const RAW_NOT_IMPLEMENTED: u32 = 0xC000_0002;
    const RAW_INVALID_PARAMETER: u32 = 0xC000_000D;
    const RAW_SHARING_VIOLATION: u32 = 0xC000_0043;

    /// Success and informational codes both count as success
    pub fn is_success(self) -> bool {
        self.raw() < 0x8000_0000
    }

    /// Numeric status value
    pub fn raw(self) -> u32 {
        match self {
            Status::Success => Self::RAW_SUCCESS,
            Status::SharingViolation => Self::RAW_SHARING_VIOLATION,
            Status::InvalidParameter => Self::RAW_INVALID_PARAMETER,
            Status::NotImplemented => Self::RAW_NOT_IMPLEMENTED,
            Status::Unsuccessful => Self::RAW_UNSUCCESSFUL,
            Status::Other(raw) => raw,
        }
    }

    /// Classify a numeric status value
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            Self::RAW_SUCCESS => Status::Success,
            Self::RAW_SHARING_VIOLATION => Status::SharingViolation,
            Self::RAW_INVALID_PARAMETER => Status::InvalidParameter,
            Self::RAW_NOT_IMPLEMENTED => Status::NotImplemented,
            Self::RAW_UNSUCCESSFUL => Status::Unsuccessful,
            other => Status::Other(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::SharingViolation => write!(f, "sharing violation"),
            Status::InvalidParameter => write!(f, "invalid parameter"),
            Status::NotImplemented => write!(f, "not implemented"),
            Status::Unsuccessful => write!(f, "unsuccessful"),
            Status::Other(raw) => write!(f, "status {:#010x}", raw),
        }
    }
}
