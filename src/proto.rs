/// Request/response framing.
pub mod codec;
/// Outcome classification and frame emission.
pub mod emit;
/// Opcode and status code spaces.
pub mod status;
