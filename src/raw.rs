//! The raw pulse-train model: the universal interchange currency between
//! every format and between this crate and a transport device.

use crate::code;
use crate::error::Error;
use crate::params;

/// One logical burst of alternating mark/space durations (microseconds),
/// repeated `count` times back-to-back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub pulses: Vec<i64>,
    pub count: i64,
}

impl RawPacket {
    pub fn new(pulses: Vec<i64>) -> Result<Self, Error> {
        Self::with_count(pulses, 1)
    }

    pub fn with_count(pulses: Vec<i64>, count: i64) -> Result<Self, Error> {
        if pulses.len() % 2 != 0 {
            return Err(Error::data("IR pulse data length not a multiple of 2"));
        }
        if count < 1 {
            return Err(Error::data(format!("Invalid packet repeat count: {count}")));
        }
        Ok(RawPacket { pulses, count })
    }
}

/// An ordered list of raw packets plus the carrier and repeat metadata that
/// apply to the emission as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCode {
    pub packets: Vec<RawPacket>,
    pub fc: i64,
    pub count: i64,
    pub packet_interval: i64,
}

impl Default for RawCode {
    fn default() -> Self {
        RawCode {
            packets: Vec::new(),
            fc: 38000,
            count: 1,
            packet_interval: 0,
        }
    }
}

impl RawCode {
    pub const NAMES: &'static [&'static str] = &["raw", "rawpm"];

    pub fn new(packets: Vec<RawPacket>) -> Self {
        RawCode {
            packets,
            ..Default::default()
        }
    }

    /// A raw code is already raw.
    pub fn to_raw(&self) -> RawCode {
        self.clone()
    }

    /// Produces a semantically equivalent raw code with exactly one packet
    /// and a canonical trailing gap.
    ///
    /// # Test
    ///
    /// ```
    /// use ircode::raw::{RawCode, RawPacket};
    ///
    /// let code = RawCode {
    ///     packets: vec![
    ///         RawPacket::new(vec![9024, 4512]).unwrap(),
    ///         RawPacket::new(vec![563, 563]).unwrap(),
    ///     ],
    ///     fc: 38000,
    ///     count: 1,
    ///     packet_interval: 0,
    /// };
    /// let flat = code.flatten(true);
    /// assert_eq!(flat.packets.len(), 1);
    /// assert_eq!(flat.packets[0].pulses, vec![9024, 4512, 563, 563]);
    /// ```
    pub fn flatten(&self, no_repeats: bool) -> RawCode {
        let mut flat = if self.packets.len() == 1 {
            let mut clone = self.clone();
            clone.count *= clone.packets[0].count;
            clone.packets[0].count = 1;
            clone
        } else {
            let mut pulses = Vec::new();
            for packet in &self.packets {
                for _ in 0..packet.count {
                    pulses.extend_from_slice(&packet.pulses);
                }
            }
            RawCode {
                packets: vec![RawPacket { pulses, count: 1 }],
                fc: self.fc,
                count: self.count,
                packet_interval: self.packet_interval,
            }
        };

        let length: i64 = flat.packets[0].pulses.iter().sum();
        if flat.count > 1 && length < flat.packet_interval {
            let last = flat.packets[0].pulses.last_mut().unwrap();
            *last += flat.packet_interval - length;
        }

        if no_repeats && flat.count > 1 {
            let pulses = flat.packets[0].pulses.clone();
            let mut repeated = Vec::with_capacity(pulses.len() * flat.count as usize);
            for _ in 0..flat.count {
                repeated.extend_from_slice(&pulses);
            }
            flat.packets[0].pulses = repeated;
            flat.count = 1;
        }

        flat.packet_interval = 0;
        flat
    }

    /// Parses the `raw:`/`rawpm:` text grammar:
    /// `raw:[params:]p1,p2,...;q1,q2,...`.
    pub fn parse_data(data: &str) -> Result<Vec<RawPacket>, Error> {
        let mut packets = Vec::new();
        for part in data.split(';') {
            packets.push(Self::parse_one_packet(part)?);
        }
        Ok(packets)
    }

    fn parse_one_packet(s: &str) -> Result<RawPacket, Error> {
        let s = s.trim();
        let s = s.strip_prefix('[').unwrap_or(s);
        let s = s.strip_suffix(']').unwrap_or(s);

        let (count, rest) = match s.split_once('/') {
            Some((n, rest)) => {
                let n: i64 = n
                    .trim()
                    .parse()
                    .map_err(|_| Error::parse(format!("Invalid packet repeat count: {n:?}")))?;
                (n, rest)
            }
            None => (1, s),
        };

        let mut pulses = Vec::new();
        for tok in rest.split(|c: char| c == ',' || c.is_whitespace()) {
            if tok.is_empty() {
                continue;
            }
            let v: i64 = tok
                .parse()
                .map_err(|_| Error::parse(format!("Invalid pulse value: {tok:?}")))?;
            pulses.push(v);
        }

        if pulses.len() % 2 != 0 {
            pulses.push(1000);
        }

        RawPacket::with_count(pulses, count)
    }

    /// Parses the full `raw:[f=...,c=...,pi=...:]p1,p2,...;...` text form,
    /// including the base `fc`/`count`/`packet_interval` parameters every
    /// format carries.
    pub fn parse_text(body: &str) -> Result<RawCode, Error> {
        let (options, data) = code::split_params_and_data(body)?;
        let mut fc = 38000i64;
        let mut count = 1i64;
        let mut packet_interval = 0i64;
        if !options.is_empty() {
            for (key, value) in params::parse_short_params(options)? {
                match key.as_str() {
                    "f" => fc = value,
                    "c" => count = value,
                    "pi" => packet_interval = value,
                    other => return Err(Error::data(format!("Unknown options: [{other:?}]"))),
                }
            }
        }
        Ok(RawCode {
            packets: Self::parse_data(data)?,
            fc,
            count,
            packet_interval,
        })
    }

    pub fn to_text(&self) -> String {
        let mut parts = Vec::new();
        if self.fc != 38000 {
            parts.push(format!("f={}", self.fc));
        }
        if self.count != 1 {
            parts.push(format!("c={}", self.count));
        }
        if self.packet_interval != 0 {
            parts.push(format!("pi={}", self.packet_interval));
        }
        let data = self.format_data();
        if parts.is_empty() {
            format!("{}::{data}", Self::NAMES[0])
        } else {
            format!("{}:{}:{data}", Self::NAMES[0], parts.join(","))
        }
    }

    pub fn to_struct_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(
            "format".to_string(),
            serde_json::Value::String(Self::NAMES[0].to_string()),
        );
        if self.fc != 38000 {
            map.insert("fc".to_string(), serde_json::Value::from(self.fc));
        }
        if self.count != 1 {
            map.insert("count".to_string(), serde_json::Value::from(self.count));
        }
        if self.packet_interval != 0 {
            map.insert(
                "packet_interval".to_string(),
                serde_json::Value::from(self.packet_interval),
            );
        }
        map.insert(
            "data".to_string(),
            serde_json::Value::String(self.format_data()),
        );
        serde_json::Value::Object(map)
    }

    pub fn from_struct_value(value: &serde_json::Value) -> Result<RawCode, Error> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::data("Raw struct form must be an object"))?;
        let data = object
            .get("data")
            .ok_or_else(|| Error::data("No data in struct"))?
            .as_str()
            .ok_or_else(|| Error::data("Raw data must be a string"))?;
        Ok(RawCode {
            packets: Self::parse_data(data)?,
            fc: object.get("fc").and_then(|v| v.as_i64()).unwrap_or(38000),
            count: object.get("count").and_then(|v| v.as_i64()).unwrap_or(1),
            packet_interval: object
                .get("packet_interval")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        })
    }

    pub fn format_data(&self) -> String {
        self.packets
            .iter()
            .map(Self::format_one_packet)
            .collect::<Vec<_>>()
            .join(";")
    }

    fn format_one_packet(packet: &RawPacket) -> String {
        let pulses = packet
            .pulses
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        if packet.count != 1 {
            format!("{}/{}", packet.count, pulses)
        } else {
            pulses
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulses(v: &[i64]) -> RawPacket {
        RawPacket::new(v.to_vec()).unwrap()
    }

    #[test]
    fn rejects_odd_pulse_length() {
        assert!(RawPacket::new(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn flatten_single_packet_absorbs_count() {
        let code = RawCode {
            packets: vec![RawPacket::with_count(vec![1, 2], 3).unwrap()],
            fc: 38000,
            count: 1,
            packet_interval: 0,
        };
        let flat = code.flatten(false);
        assert_eq!(flat.count, 3);
        assert_eq!(flat.packets[0].count, 1);
        assert_eq!(flat.packets[0].pulses, vec![1, 2]);
    }

    #[test]
    fn flatten_pads_trailing_gap_to_packet_interval() {
        let code = RawCode {
            packets: vec![pulses(&[100, 100])],
            fc: 38000,
            count: 2,
            packet_interval: 1000,
        };
        let flat = code.flatten(false);
        assert_eq!(flat.packets[0].pulses, vec![100, 900]);
    }

    #[test]
    fn flatten_no_repeats_expands_count_into_pulses() {
        let code = RawCode {
            packets: vec![pulses(&[100, 900])],
            fc: 38000,
            count: 2,
            packet_interval: 1000,
        };
        let flat = code.flatten(true);
        assert_eq!(flat.count, 1);
        assert_eq!(flat.packets[0].pulses, vec![100, 900, 100, 900]);
    }

    #[test]
    fn flatten_is_idempotent() {
        let code = RawCode {
            packets: vec![pulses(&[9024, 4512]), pulses(&[563, 563])],
            fc: 38000,
            count: 1,
            packet_interval: 0,
        };
        let once = code.flatten(true);
        let twice = once.flatten(true);
        assert_eq!(once, twice);
    }

    #[test]
    fn parse_data_multi_packet_with_counts_and_brackets() {
        let packets = RawCode::parse_data("[2/9024,4512];563,1687").unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].count, 2);
        assert_eq!(packets[0].pulses, vec![9024, 4512]);
        assert_eq!(packets[1].count, 1);
        assert_eq!(packets[1].pulses, vec![563, 1687]);
    }

    #[test]
    fn parse_data_odd_length_gets_implicit_trailing_gap() {
        let packets = RawCode::parse_data("9024,4512,563").unwrap();
        assert_eq!(packets[0].pulses, vec![9024, 4512, 563, 1000]);
    }

    #[test]
    fn format_data_round_trips_through_parse() {
        let packets = vec![
            RawPacket::with_count(vec![9024, 4512], 2).unwrap(),
            RawPacket::new(vec![563, 1687]).unwrap(),
        ];
        let code = RawCode {
            packets,
            ..Default::default()
        };
        let text = code.format_data();
        let reparsed = RawCode::parse_data(&text).unwrap();
        assert_eq!(reparsed, code.packets);
    }
}
