use std::fmt;

/// Request operation kind.
///
/// Modeled as an open `u32` newtype so unknown values can be carried in errors and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Opcode(u32);

impl Opcode {
    /// Render the payload as a document.
    pub const RENDER: Opcode = Opcode(0);

    /// Wrap a raw wire value.
    pub const fn from_code(code: u32) -> Self {
        Self(code)
    }

    /// Raw wire value.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// `true` for opcodes this worker can execute.
    pub fn is_supported(self) -> bool {
        self == Self::RENDER
    }
}

/// Response status code.
///
/// Open enumeration: values outside the named constants are reserved for future
/// statuses and survive a decode/encode cycle unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Status(u32);

impl Status {
    /// The payload is the rendered image.
    pub const OK: Status = Status(0);
    /// The document compiler rejected the source; payload is its output.
    pub const COMPILE_ERROR: Status = Status(1);
    /// The rasterizer failed; payload is its stderr or empty.
    pub const RASTER_ERROR: Status = Status(2);
    /// Reserved for workers that report internal faults in-band. Never emitted here.
    pub const INTERNAL_ERROR: Status = Status(3);

    /// Wrap a raw wire value.
    pub const fn from_code(code: u32) -> Self {
        Self(code)
    }

    /// Raw wire value.
    pub const fn code(self) -> u32 {
        self.0
    }

    /// `true` for the statuses named by the protocol.
    pub fn is_known(self) -> bool {
        self.0 <= Self::INTERNAL_ERROR.0
    }

    /// `true` only for [`Status::OK`].
    pub fn is_success(self) -> bool {
        self == Self::OK
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Self::OK => Some("ok"),
            Self::COMPILE_ERROR => Some("compile-error"),
            Self::RASTER_ERROR => Some("raster-error"),
            Self::INTERNAL_ERROR => Some("internal-error"),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "reserved({})", self.0),
        }
    }
}

impl From<Status> for u32 {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/proto/status.rs"]
mod tests;
