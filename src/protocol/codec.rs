//! Line codec for the fan-controller ASCII protocol.
//!
//! Inbound records are CR-LF terminated, comma separated and start with a tag:
//!
//! | Tag        | Fields | Decoded as        |
//! |------------|--------|-------------------|
//! | `FCD`      | 17     | [`Frame::Status`] |
//! | `FCR`      | 33     | [`Frame::Config`] |
//! | `FCA`      | 1      | [`Frame::ApplyAck`] |
//! | `ERR:<msg>`| 1      | [`Frame::Error`]  |
//!
//! The device sometimes emits a NUL byte in front of a record; it is stripped
//! before the tag is examined. Anything else, including a known tag with the
//! wrong field count, decodes to `None`.

use super::model::{
    Config, FanConfig, FanType, Outputs, Rpms, SensorControl, SensorType, SensorTypes, Status,
    Temperatures, FAN_CHANNELS,
};
use memchr::memmem;

/// Record terminator used in both directions.
pub const LINE_ENDING: &str = "\r\n";

/// Command asking the device to report its configuration.
pub const QUERY_COMMAND: &str = "FCQ\r\n";

const STATUS_TAG: &str = "FCD";
const CONFIG_TAG: &str = "FCR";
const ACK_TAG: &str = "FCA";
const ERROR_TAG: &str = "ERR";
const ERROR_PREFIX: &str = "ERR:";
const SET_TAG: &str = "FCS";

const STATUS_FIELDS: usize = 17;
const CONFIG_FIELDS: usize = 33;
const FAN_CONFIG_FIELDS: usize = 7;

/// One decoded record received from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Status(Status),
    Config(Config),
    /// The last `FCS` command was accepted.
    ApplyAck,
    /// Device-reported error; the text after `ERR:`, trimmed of spaces.
    Error(String),
}

/// Iterate the CR-LF separated records of `buffer`.
///
/// A trailing fragment without a terminator is yielded as the last record
/// and decodes like a complete one. A record cut inside a number therefore
/// yields the truncated value, e.g. `30` for a fan that reported `3000`.
pub fn records(buffer: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = Some(buffer);
    std::iter::from_fn(move || {
        let current = rest?;
        match memmem::find(current, LINE_ENDING.as_bytes()) {
            Some(end) => {
                rest = Some(&current[end + LINE_ENDING.len()..]);
                Some(&current[..end])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

/// Decode the first recognised frame in `buffer`.
pub fn parse(buffer: &[u8]) -> Option<Frame> {
    records(buffer).find_map(parse_record)
}

/// Decode every recognised frame in `buffer`, in arrival order.
///
/// As with [`records`], an unterminated tail is decoded too, so callers that
/// read partial lines can see truncated values in the last frame.
pub fn parse_all(buffer: &[u8]) -> Vec<Frame> {
    records(buffer).filter_map(parse_record).collect()
}

/// Decode a single record without its line terminator.
pub fn parse_record(record: &[u8]) -> Option<Frame> {
    let record = record.strip_prefix(&[0u8]).unwrap_or(record);
    let text = String::from_utf8_lossy(record);
    let fields: Vec<&str> = text.split(',').collect();

    match (fields[0], fields.len()) {
        (STATUS_TAG, STATUS_FIELDS) => Some(Frame::Status(decode_status(&fields[1..]))),
        (CONFIG_TAG, CONFIG_FIELDS) => Some(Frame::Config(decode_config(&fields[1..]))),
        (ACK_TAG, 1) => Some(Frame::ApplyAck),
        (tag, 1) if tag.starts_with(ERROR_TAG) => {
            let message = tag.strip_prefix(ERROR_PREFIX).unwrap_or(tag);
            Some(Frame::Error(message.trim_matches(' ').to_string()))
        }
        _ => None,
    }
}

/// Render the `FCS` command that replaces the device configuration.
///
/// Field order matches `FCR`, so the payload decodes back to `config`.
pub fn encode(config: &Config) -> String {
    let mut fields = Vec::with_capacity(CONFIG_FIELDS);
    fields.push(SET_TAG.to_string());
    fields.extend(
        config
            .sensor_types
            .as_array()
            .iter()
            .map(|sensor| sensor.code().to_string()),
    );
    for fan in &config.fans {
        fields.push(fan.minimum_power.to_string());
        fields.push(fan.sensor_control.code().to_string());
        fields.push(fan.minimum_temperature.to_string());
        fields.push(fan.maximum_temperature.to_string());
        fields.push(u8::from(fan.allow_stopped).to_string());
        fields.push(fan.fan_type_a.code().to_string());
        fields.push(fan.fan_type_b.code().to_string());
    }

    let mut command = fields.join(",");
    command.push_str(LINE_ENDING);
    command
}

fn decode_status(fields: &[&str]) -> Status {
    Status {
        temperatures: Temperatures {
            sensor_a: to_i8(fields[0]),
            sensor_b: to_i8(fields[1]),
            sensor_c: to_i8(fields[2]),
            sensor_d: to_i8(fields[3]),
        },
        outputs: Outputs {
            fan1: to_i8(fields[4]),
            fan2: to_i8(fields[5]),
            fan3: to_i8(fields[6]),
            fan4: to_i8(fields[7]),
        },
        rpms: Rpms {
            fan1_a: to_i16(fields[8]),
            fan1_b: to_i16(fields[9]),
            fan2_a: to_i16(fields[10]),
            fan2_b: to_i16(fields[11]),
            fan3_a: to_i16(fields[12]),
            fan3_b: to_i16(fields[13]),
            fan4_a: to_i16(fields[14]),
            fan4_b: to_i16(fields[15]),
        },
    }
}

fn decode_config(fields: &[&str]) -> Config {
    let sensor_types = SensorTypes {
        sensor_a: SensorType::from_code(to_i8(fields[0])),
        sensor_b: SensorType::from_code(to_i8(fields[1])),
        sensor_c: SensorType::from_code(to_i8(fields[2])),
        sensor_d: SensorType::from_code(to_i8(fields[3])),
    };

    let mut fans = [FanConfig::default(); FAN_CHANNELS];
    for (fan, group) in fans.iter_mut().zip(fields[4..].chunks_exact(FAN_CONFIG_FIELDS)) {
        *fan = FanConfig {
            minimum_power: to_i8(group[0]),
            sensor_control: SensorControl::from_code(to_i8(group[1])),
            minimum_temperature: to_i16(group[2]),
            maximum_temperature: to_i16(group[3]),
            allow_stopped: to_i8(group[4]) > 0,
            fan_type_a: FanType::from_code(to_i8(group[5])),
            fan_type_b: FanType::from_code(to_i8(group[6])),
        };
    }

    Config { sensor_types, fans }
}

/// Parse decimal text and narrow it with wrapping semantics; invalid text is 0.
fn to_wide(field: &str) -> i64 {
    field.parse::<i64>().unwrap_or(0)
}

fn to_i8(field: &str) -> i8 {
    to_wide(field) as i8
}

fn to_i16(field: &str) -> i16 {
    to_wide(field) as i16
}
