pub mod password;
pub mod window;

pub use window::{VotingStatus, VotingWindow, WindowError};
