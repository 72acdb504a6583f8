//! Outbound message shapes handed to publication backends.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    AssembledFrame, CartesianPoint, ChannelKey, GpsTimestamp, SensorStatusRecord, SerialNumber,
    StaticTransform,
};

/// Status stream message: flat record plus raw payload
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorStatusMessage {
    /// Host stamp (microseconds)
    pub stamp: i64,

    pub handle: u64,
    pub serial_number: SerialNumber,
    pub model_name: String,
    pub model: u16,
    pub firmware_version: u32,

    pub last_reported_temperature: f32,
    pub last_reported_humidity: f32,
    pub last_reported_age: f32,
    pub measurement_period: f32,

    pub ptp_ts: i64,
    pub gps_ts_year: u8,
    pub gps_ts_month: u8,
    pub gps_ts_day: u8,
    pub gps_ts_hour: u8,
    pub gps_ts_min: u8,
    pub gps_ts_sec: u8,

    pub return_count: u8,
    pub segment_count: u8,

    pub is_mocked: bool,
    pub is_pps_connected: bool,
    pub is_nmea_connected: bool,
    pub is_ptp_connected: bool,
    pub is_calibrated: bool,
    pub is_over_heated: bool,

    /// Version of the driver that produced the message
    pub driver_version: String,

    /// Raw status payload, kept for forward compatibility
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

impl SensorStatusMessage {
    /// Map a status snapshot onto the wire shape
    pub fn from_record(record: &SensorStatusRecord, stamp: i64) -> Self {
        let GpsTimestamp {
            year,
            month,
            day,
            hour,
            min,
            sec,
        } = record.gps_ts;

        Self {
            stamp,
            handle: record.handle.0,
            serial_number: record.serial_number,
            model_name: record.model_name.clone(),
            model: record.model,
            firmware_version: record.firmware_version,
            last_reported_temperature: record.last_reported_temperature,
            last_reported_humidity: record.last_reported_humidity,
            last_reported_age: record.last_reported_age,
            measurement_period: record.measurement_period,
            ptp_ts: record.ptp_ts,
            gps_ts_year: year,
            gps_ts_month: month,
            gps_ts_day: day,
            gps_ts_hour: hour,
            gps_ts_min: min,
            gps_ts_sec: sec,
            return_count: record.return_count,
            segment_count: record.segment_count,
            is_mocked: record.is_mocked,
            is_pps_connected: record.is_pps_connected,
            is_nmea_connected: record.is_nmea_connected,
            is_ptp_connected: record.is_ptp_connected,
            is_calibrated: record.is_calibrated,
            is_over_heated: record.is_over_heated,
            driver_version: env!("CARGO_PKG_VERSION").to_string(),
            data: record.raw.clone(),
        }
    }
}

/// Point-cloud stream message
///
/// Unorganized cloud (`height == 1`) of packed `CartesianPoint` records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudMessage {
    /// Host stamp (microseconds)
    pub stamp: i64,
    pub frame_id: String,
    pub height: u32,
    pub width: u32,
    pub point_step: u32,
    pub data: Bytes,
}

impl PointCloudMessage {
    /// Copy an assembled frame into an owned message
    pub fn from_frame(frame: &AssembledFrame) -> Self {
        Self {
            stamp: frame.timestamp,
            frame_id: frame.frame_id.clone(),
            height: 1,
            width: frame.points.len() as u32,
            point_step: CartesianPoint::STRIDE as u32,
            data: Bytes::copy_from_slice(frame.as_bytes()),
        }
    }

    /// Decode the packed points
    ///
    /// Returns None if the payload is not a whole number of records.
    pub fn points(&self) -> Option<Vec<CartesianPoint>> {
        if self.data.len() % CartesianPoint::STRIDE != 0 {
            return None;
        }
        Some(
            self.data
                .chunks_exact(CartesianPoint::STRIDE)
                .map(bytemuck::pod_read_unaligned::<CartesianPoint>)
                .collect(),
        )
    }
}

/// Owned message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    PointCloud(PointCloudMessage),
    Status(SensorStatusMessage),
    Transform(StaticTransform),
}

/// A message bound for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Monotonic sequence number assigned by the publisher
    pub seq: u64,
    pub channel: ChannelKey,
    pub body: MessageBody,
}

impl OutboundMessage {
    /// Short kind label (used for logging/file names)
    pub fn kind(&self) -> &'static str {
        match self.body {
            MessageBody::PointCloud(_) => "points",
            MessageBody::Status(_) => "status",
            MessageBody::Transform(_) => "transform",
        }
    }
}
