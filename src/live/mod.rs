pub mod poller;
pub mod render;

pub use poller::{HttpLiveSource, LivePoller, LiveSource, LiveState, Phase, TICK_INTERVAL};
pub use render::{RECENT_DISPLAY_LIMIT, render, time_ago};
