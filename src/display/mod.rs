//! Axis scaling and the presentation boundary.
pub mod axis;
pub mod sink;

pub use axis::{
    finite_range, frequency_axis, time_axis_bounds, AxisBounds, AxisPolicy, AxisScaler,
    AxisUpdate,
};
pub use sink::{
    ChannelSink, ConsoleSink, DisplayFrame, FinalReport, JsonLinesSink, PresentationSink,
    RecordingSink, SinkMessage, XAxisKind,
};
