//! Broadlink binary wire format: a base64 envelope of header byte, repeat
//! count, little-endian payload length, and short/long tick-encoded pulses.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::code;
use crate::error::Error;
use crate::params::ParamSpec;
use crate::pulse::scale_pulses;
use crate::raw::RawCode;

const CLOCK: i64 = 30453;
const HEADER: u8 = 0x26;

/// Broadlink carries no tunable parameters of its own: carrier, repeat
/// count, and packet interval are fixed, since the repeat count already
/// lives in the envelope's header byte.
fn specs() -> &'static [ParamSpec] {
    &[]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadlinkCode {
    pub packets: Vec<String>,
}

impl BroadlinkCode {
    pub const NAMES: &'static [&'static str] = &["broadlink", "b64"];
    pub const FC: i64 = 38000;

    pub fn new(overrides: BTreeMap<String, i64>, packets: Vec<String>) -> Result<Self, Error> {
        if !overrides.is_empty() {
            let keys: Vec<_> = overrides.keys().cloned().collect();
            return Err(Error::data(format!("Unknown options: {keys:?}")));
        }
        for packet in &packets {
            BASE64
                .decode(packet)
                .map_err(|_| Error::data(format!("Invalid base64 data: {packet:?}")))?;
        }
        Ok(BroadlinkCode { packets })
    }

    pub fn from_string(body: &str) -> Result<Self, Error> {
        let (options, data) = code::split_params_and_data(body)?;
        if !options.is_empty() {
            return Err(Error::data(format!("Unknown options: {options:?}")));
        }
        let packets: Vec<String> = data.split(';').map(str::to_string).collect();
        Self::new(BTreeMap::new(), packets)
    }

    pub fn to_string_code(&self) -> String {
        let data = self.packets.join(";");
        code::format_text(Self::NAMES[0], specs(), &[], &data)
    }

    pub fn from_struct(value: &serde_json::Value) -> Result<Self, Error> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::data("Broadlink struct form must be an object"))?;
        let overrides = code::struct_param_overrides(object)?;
        let packets = object
            .get("data")
            .ok_or_else(|| Error::data("No data in struct"))?
            .as_array()
            .ok_or_else(|| Error::data("Broadlink data must be a list of base64 strings"))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::data("Broadlink packet must be a string"))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Self::new(overrides, packets)
    }

    pub fn to_struct(&self) -> serde_json::Value {
        let data = serde_json::Value::Array(
            self.packets
                .iter()
                .map(|p| serde_json::Value::String(p.clone()))
                .collect(),
        );
        code::to_struct_value(Self::NAMES[0], specs(), &[], data)
    }

    pub fn simplify_params(&mut self, _tolerance: f64) {}

    fn encode_packet(&self, packet: &str) -> Result<(i64, Vec<i64>), Error> {
        let bytes = BASE64
            .decode(packet)
            .map_err(|_| Error::encode(format!("Invalid base64 data: {packet:?}")))?;
        if bytes.first() != Some(&HEADER) {
            return Err(Error::encode(format!(
                "Packet header is not 0x26: {:#04x}",
                bytes.first().copied().unwrap_or(0)
            )));
        }
        let count = *bytes.get(1).ok_or_else(|| Error::encode("Packet too short"))? as i64 + 1;
        let length = *bytes.get(2).ok_or_else(|| Error::encode("Packet too short"))? as usize
            + ((*bytes.get(3).ok_or_else(|| Error::encode("Packet too short"))? as usize) << 8);
        if length > bytes.len().saturating_sub(4) {
            return Err(Error::encode("Packet is too short"));
        }
        let payload = &bytes[4..4 + length];

        let mut ticks = Vec::new();
        let mut i = 0usize;
        while i < payload.len() {
            let v = payload[i];
            if v == 0 {
                if i + 2 >= payload.len() {
                    return Err(Error::encode("Truncated long pulse encoding"));
                }
                ticks.push(((payload[i + 1] as i64) << 8) | payload[i + 2] as i64);
                i += 3;
            } else {
                ticks.push(v as i64);
                i += 1;
            }
        }

        let pulses = scale_pulses(&ticks, CLOCK, 1_000_000);
        Ok((count, pulses))
    }

    pub fn to_raw(&self) -> Result<RawCode, Error> {
        let mut encoded = Vec::with_capacity(self.packets.len());
        for packet in &self.packets {
            encoded.push(self.encode_packet(packet)?);
        }
        code::assemble_raw(encoded, Self::FC, 1, 0)
    }

    pub fn from_code(raw: &RawCode) -> Result<Self, Error> {
        let flat = raw.to_raw().flatten(false);
        let packet = flat
            .packets
            .first()
            .ok_or_else(|| Error::decode("No data"))?;

        if flat.count > 256 {
            return Err(Error::decode(format!(
                "Broadlink format only supports up to 256 repeats (got: {})",
                flat.count
            )));
        }

        let ticks = scale_pulses(&packet.pulses, 1_000_000, CLOCK);

        let mut body = Vec::with_capacity(ticks.len());
        for tick in ticks {
            if tick < 1 {
                return Err(Error::decode("Pulse length < 1"));
            } else if tick > 0xffff {
                return Err(Error::decode(format!("Pulse length too long: {tick}")));
            } else if tick > 255 {
                body.push(0u8);
                body.push((tick >> 8) as u8);
                body.push((tick & 0xff) as u8);
            } else {
                body.push(tick as u8);
            }
        }
        if body.len() > 0xffff {
            return Err(Error::decode(format!("Packet is too long: {} bytes", body.len())));
        }

        let mut envelope = Vec::with_capacity(body.len() + 4);
        envelope.push(HEADER);
        envelope.push((flat.count - 1) as u8);
        envelope.push((body.len() & 0xff) as u8);
        envelope.push((body.len() >> 8) as u8);
        envelope.extend(body);
        let padded_len = envelope.len().div_ceil(16) * 16;
        envelope.resize(padded_len, 0);

        log::debug!(
            "broadlink: encoded {} bytes ({} ticks) into envelope",
            envelope.len(),
            packet.pulses.len()
        );

        Ok(BroadlinkCode {
            packets: vec![BASE64.encode(envelope)],
        })
    }
}
