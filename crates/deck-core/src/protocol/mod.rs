//! Serial wire protocol: image frames, inbound tokens, panel telemetry,
//! handshake markers, and the bounded polling primitive.

pub mod command;
pub mod frame;
pub mod markers;
pub mod panel;
pub mod poll;

pub use command::{decode_line, parse_token, InboundToken, MediaCommand};
pub use frame::{decode_length_prefix, encode_frame, encode_length_prefix, FrameError};
pub use panel::{map_slider, EdgeDetector, PanelError, PanelSnapshot};
pub use poll::{poll_until, PollWindow};
