//! Pronto CCF ASCII hex codec: 4-digit hex words giving a clock divisor,
//! a one-shot pulse-pair count, a (currently always empty) repeat region,
//! and the pulse pairs themselves.

use std::collections::BTreeMap;

use crate::code;
use crate::error::Error;
use crate::params::ParamSpec;
use crate::pulse::scale_pulses;
use crate::raw::RawCode;

const CLOCK: i64 = 4_147_200;

fn specs() -> &'static [ParamSpec] {
    &[]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProntoCode {
    pub fc: i64,
    pub packets: Vec<String>,
}

impl ProntoCode {
    pub const NAMES: &'static [&'static str] = &["pronto"];

    pub fn new(overrides: BTreeMap<String, i64>, packets: Vec<String>) -> Result<Self, Error> {
        if !overrides.is_empty() {
            let keys: Vec<_> = overrides.keys().cloned().collect();
            return Err(Error::data(format!("Unknown options: {keys:?}")));
        }
        if packets.is_empty() {
            return Err(Error::data("Pronto code has no data"));
        }
        let base = header_base(&packets[0])?;
        let fc = (CLOCK as f64 / base as f64).round() as i64;
        for packet in &packets {
            validate_packet(packet)?;
        }
        Ok(ProntoCode { fc, packets })
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
            .ok_or_else(|| Error::data("Pronto struct form must be an object"))?;
        let overrides = code::struct_param_overrides(object)?;
        let packets = object
            .get("data")
            .ok_or_else(|| Error::data("No data in struct"))?
            .as_array()
            .ok_or_else(|| Error::data("Pronto data must be a list of hex-word strings"))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::data("Pronto packet must be a string"))
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
        let words = parse_words(packet)?;
        if words[0] != 0 {
            return Err(Error::encode(format!(
                "Packet header is not 0: {:#06x}",
                words[0]
            )));
        }
        let base = words[1];
        let once_len = words[2] as usize;
        let repeat_len = words[3] as usize;
        if 2 * once_len + 2 * repeat_len + 4 != words.len() {
            return Err(Error::encode("Mismatched packet length"));
        }
        let ticks = &words[4..4 + once_len * 2];
        let pulses = scale_pulses(ticks, CLOCK, base * 1_000_000);
        Ok((1, pulses))
    }

    pub fn to_raw(&self) -> Result<RawCode, Error> {
        let mut encoded = Vec::with_capacity(self.packets.len());
        for packet in &self.packets {
            encoded.push(self.encode_packet(packet)?);
        }
        code::assemble_raw(encoded, self.fc, 1, 0)
    }

    pub fn from_code(raw: &RawCode) -> Result<Self, Error> {
        let base = (CLOCK as f64 / raw.fc as f64).round() as i64;
        if base < 1 {
            return Err(Error::decode(format!("Carrier frequency too high: {}", raw.fc)));
        }
        let fc = (CLOCK as f64 / base as f64).round() as i64;

        let flat = raw.to_raw().flatten(true);
        let pulses_us = &flat
            .packets
            .first()
            .ok_or_else(|| Error::decode("No data"))?
            .pulses;

        let ticks = scale_pulses(pulses_us, base * 1_000_000, CLOCK);

        if ticks.len() % 2 != 0 {
            return Err(Error::decode("Odd pulse count"));
        }
        if ticks.len() > 0xffff * 2 {
            return Err(Error::decode(format!(
                "Packet is too long: {} pulses",
                ticks.len() / 2
            )));
        }

        let mut words = vec![0i64, base, (ticks.len() / 2) as i64, 0];
        for tick in &ticks {
            if *tick < 1 {
                return Err(Error::decode("Pulse length < 1"));
            }
            if *tick > 0xffff {
                return Err(Error::decode(format!("Pulse length too long: {tick}")));
            }
            words.push(*tick);
        }

        let text = words
            .iter()
            .map(|w| format!("{w:04X}"))
            .collect::<Vec<_>>()
            .join(" ");

        log::debug!("pronto: encoded {} pulses at base {base} (fc={fc})", ticks.len());

        Ok(ProntoCode {
            fc,
            packets: vec![text],
        })
    }
}

fn parse_words(packet: &str) -> Result<Vec<i64>, Error> {
    packet
        .split_whitespace()
        .map(|w| {
            i64::from_str_radix(w, 16).map_err(|_| Error::parse(format!("Invalid hex word: {w:?}")))
        })
        .collect()
}

fn header_base(packet: &str) -> Result<i64, Error> {
    let words = parse_words(packet)?;
    words
        .get(1)
        .copied()
        .ok_or_else(|| Error::data(format!("Pronto packet missing clock word: {packet:?}")))
}

fn validate_packet(packet: &str) -> Result<(), Error> {
    let words = parse_words(packet)?;
    if words.first().copied() != Some(0) {
        return Err(Error::data(format!(
            "Invalid Pronto packet: {packet:?}"
        )));
    }
    let once_len = *words.get(2).ok_or_else(|| Error::data("Pronto packet too short"))? as usize;
    let repeat_len = *words.get(3).ok_or_else(|| Error::data("Pronto packet too short"))? as usize;
    if 2 * once_len + 2 * repeat_len + 4 != words.len() {
        return Err(Error::data(format!("Invalid Pronto packet: {packet:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawCode, RawPacket};

    #[test]
    fn decodes_two_pulse_pairs_from_known_text() {
        let code =
            ProntoCode::new(BTreeMap::new(), vec!["0000 0073 0002 0000 0158 00AC 0015 0040".to_string()])
                .unwrap();
        let raw = code.to_raw().unwrap();
        assert_eq!(raw.packets[0].pulses.len(), 4);
    }

    #[test]
    fn encode_decode_round_trip_recovers_carrier_and_pulses() {
        let pulses = vec![9024, 4512, 563, 1687];
        let raw = RawCode {
            packets: vec![RawPacket::new(pulses.clone()).unwrap()],
            fc: 38000,
            count: 1,
            packet_interval: 0,
        };
        let code = ProntoCode::from_code(&raw).unwrap();
        let back = code.to_raw().unwrap();
        for (a, b) in pulses.iter().zip(back.packets[0].pulses.iter()) {
            assert!((a - b).abs() <= 2);
        }
        let redecoded = ProntoCode::from_code(&back).unwrap();
        assert!((redecoded.fc - code.fc).abs() <= 1);
    }

    #[test]
    fn rejects_non_zero_header_word() {
        assert!(ProntoCode::new(
            BTreeMap::new(),
            vec!["0100 0073 0002 0000 0158 00AC 0015 0040".to_string()]
        )
        .is_err());
    }

    #[test]
    fn text_round_trip() {
        let code =
            ProntoCode::new(BTreeMap::new(), vec!["0000 0073 0002 0000 0158 00AC 0015 0040".to_string()])
                .unwrap();
        let text = code.to_string_code();
        let (_, body) = text.split_once(':').unwrap();
        let reparsed = ProntoCode::from_string(body).unwrap();
        assert_eq!(reparsed, code);
    }
}
