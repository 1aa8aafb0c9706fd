pub mod job;
pub mod point;
pub mod progress;
pub mod types;
pub mod volume;

pub use job::{Envelope, Lane, LaneController, LaneState, WorkerContext, WorkerMessage};
pub use point::{analyze_view_from_point, point_to_many};
pub use progress::{NoProgress, ProgressSink, ProgressTracker};
pub use types::*;
pub use volume::{analyze_view_from_volume, mutual_visibility};
