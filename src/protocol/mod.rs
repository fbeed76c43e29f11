//! The Chroma wire protocol engine .

pub mod commands;
pub mod effects;
pub mod headset;
pub mod profile;
pub mod report;

pub use commands::{Command, CommandDef};
pub use effects::EffectName;
pub use profile::{ProfileId, ProtocolProfile};
pub use report::{pack, unpack, Request, Response, Status, MAX_ARGS_LEN, REPORT_LEN};
