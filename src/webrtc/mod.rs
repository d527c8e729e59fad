/// Sender parameter model and the sender seam
pub mod sender;
/// Simulcast layer presets and initial encoding computation
pub mod simulcast;

pub use sender::{Encoding, RtpParameters, RtpSender, SenderRef};
pub use simulcast::{compute_video_encodings, SimulcastConfig, SimulcastLayer};
