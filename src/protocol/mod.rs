//! Fan-controller wire protocol: data model and line codec.

pub mod codec;
pub mod model;

pub use codec::{
    encode, parse, parse_all, parse_record, records, Frame, LINE_ENDING, QUERY_COMMAND,
};
pub use model::{
    Config, FanConfig, FanType, Outputs, Rpms, SensorControl, SensorType, SensorTypes, Status,
    Temperatures, FAN_CHANNELS,
};
