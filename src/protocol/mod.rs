//! Line protocol to the LED controller

mod frame;
mod link;

pub use frame::OutputFrame;
pub use link::{list_ports, FrameLink, LinkConfig, LinkError, SerialLink};
