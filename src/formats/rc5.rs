//! Manchester-encoded RC5 codec: 14-bit frames split from a pulse train by
//! inter-frame pause, with a caller-persisted toggle bit.

use std::collections::BTreeMap;

use crate::code::{self, EncodeState};
use crate::error::Error;
use crate::params::{self, ParamSpec};
use crate::pulse::{from_bits_msb, to_bits_msb};
use crate::raw::RawCode;

const PACKET_INTERVAL: usize = 0;
const BIT_TIME: usize = 1;

fn specs() -> &'static [ParamSpec] {
    static SPECS: &[ParamSpec] = &[
        ParamSpec {
            long: "packet_interval",
            short: "ri",
            validate: params::no_validation,
            default: |_| 113788,
        },
        ParamSpec {
            long: "bit_time",
            short: "tb",
            validate: params::no_validation,
            default: |_| 889,
        },
    ];
    SPECS
}

/// One RC5 command: a 5-bit address and a 7-bit command (bit 6 folded into
/// the frame's start bit, bit 5..0 transmitted directly).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rc5Packet {
    pub addr: u8,
    pub cmd: u8,
}

impl Rc5Packet {
    pub fn new(addr: u8, cmd: u8) -> Result<Self, Error> {
        if addr > 31 {
            return Err(Error::data(format!("Address {addr} not in [0..31]")));
        }
        if cmd > 127 {
            return Err(Error::data(format!("Command {cmd} not in [0..127]")));
        }
        Ok(Rc5Packet { addr, cmd })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rc5Code {
    pub fc: i64,
    pub count: i64,
    table: Vec<i64>,
    pub packets: Vec<Rc5Packet>,
}

impl Rc5Code {
    pub const NAMES: &'static [&'static str] = &["rc5"];

    pub fn packet_interval(&self) -> i64 {
        self.table[PACKET_INTERVAL]
    }
    pub fn bit_time(&self) -> i64 {
        self.table[BIT_TIME]
    }

    pub fn new(
        fc: i64,
        count: i64,
        overrides: BTreeMap<String, i64>,
        packets: Vec<Rc5Packet>,
    ) -> Result<Self, Error> {
        let table = params::resolve(specs(), overrides, false)?;
        Ok(Rc5Code {
            fc,
            count,
            table,
            packets,
        })
    }

    pub fn from_string(body: &str) -> Result<Self, Error> {
        let (options, data) = code::split_params_and_data(body)?;
        let mut fc = 38000i64;
        let mut count = 1i64;
        let overrides = if options.is_empty() {
            BTreeMap::new()
        } else {
            let mut short_overrides = params::parse_short_params(options)?;
            if let Some(v) = short_overrides.remove("f") {
                fc = v;
            }
            if let Some(v) = short_overrides.remove("c") {
                count = v;
            }
            translate_short_to_long(short_overrides)
        };
        let packets = Self::parse_data(data)?;
        Self::new(fc, count, overrides, packets)
    }

    pub fn to_string_code(&self) -> String {
        let data = self
            .packets
            .iter()
            .map(|p| format!("{},{}", p.addr, p.cmd))
            .collect::<Vec<_>>()
            .join(";");
        code::format_text_with_base(Self::NAMES[0], self.fc, self.count, specs(), &self.table, &data)
    }

    pub fn from_struct(value: &serde_json::Value) -> Result<Self, Error> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::data("RC5 struct form must be an object"))?;
        let mut overrides = code::struct_param_overrides(object)?;
        let fc = overrides.remove("fc").unwrap_or(38000);
        let count = overrides.remove("count").unwrap_or(1);
        let data = object
            .get("data")
            .ok_or_else(|| Error::data("No data in struct"))?
            .as_array()
            .ok_or_else(|| Error::data("RC5 data must be a list"))?;
        let packets = data
            .iter()
            .map(|entry| {
                let obj = entry
                    .as_object()
                    .ok_or_else(|| Error::data("RC5 packet must be an object"))?;
                let addr = obj
                    .get("addr")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| Error::data("RC5 packet missing addr"))?;
                let cmd = obj
                    .get("cmd")
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| Error::data("RC5 packet missing cmd"))?;
                Rc5Packet::new(addr as u8, cmd as u8)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Self::new(fc, count, overrides, packets)
    }

    pub fn to_struct(&self) -> serde_json::Value {
        let data = serde_json::Value::Array(
            self.packets
                .iter()
                .map(|p| {
                    serde_json::json!({"addr": p.addr, "cmd": p.cmd})
                })
                .collect(),
        );
        code::to_struct_value_with_base(
            Self::NAMES[0],
            self.fc,
            self.count,
            specs(),
            &self.table,
            data,
        )
    }

    pub fn simplify_params(&mut self, tolerance: f64) {
        params::simplify(specs(), &mut self.table, tolerance);
    }

    fn parse_data(data: &str) -> Result<Vec<Rc5Packet>, Error> {
        data.split(';').map(Self::parse_one_packet).collect()
    }

    fn parse_one_packet(s: &str) -> Result<Rc5Packet, Error> {
        let (addr, cmd) = s
            .trim()
            .split_once(',')
            .ok_or_else(|| Error::parse(format!("Invalid RC5 packet: {s:?}")))?;
        let addr = parse_int(addr)?;
        let cmd = parse_int(cmd)?;
        Rc5Packet::new(addr, cmd)
    }

    fn encode_packet(
        &self,
        packet: &Rc5Packet,
        state: Option<&mut EncodeState>,
    ) -> (i64, Vec<i64>) {
        let key = format!("rc5-toggle-{}-{}", packet.addr, packet.cmd);
        let mut toggle = 1i64;
        if let Some(ref state) = state {
            toggle = *state.get(&key).unwrap_or(&1);
        }
        toggle ^= 1;

        let start_bit: u8 = if packet.cmd & 0x40 != 0 { 0 } else { 1 };
        let mut bits = vec![start_bit, toggle as u8];
        bits.extend(to_bits_msb(packet.addr as u32, 5));
        bits.extend(to_bits_msb((packet.cmd & 0x3f) as u32, 6));

        let bit_time = self.bit_time();
        let mut pulses = vec![bit_time];
        let mut last = 1u8;
        for &b in &bits {
            if b == last {
                pulses.push(bit_time);
                pulses.push(bit_time);
            } else {
                *pulses.last_mut().unwrap() += bit_time;
                pulses.push(bit_time);
            }
            last = b;
        }
        if last == 1 {
            pulses.push(bit_time);
        }

        if let Some(state) = state {
            state.insert(key, toggle);
        }

        (1, pulses)
    }

    pub fn to_raw(&self, mut state: Option<&mut EncodeState>) -> Result<RawCode, Error> {
        let mut encoded = Vec::with_capacity(self.packets.len());
        for packet in &self.packets {
            encoded.push(self.encode_packet(packet, state.as_deref_mut()));
        }
        code::assemble_raw(encoded, self.fc, self.count, self.packet_interval())
    }

    pub fn from_code(raw: &RawCode) -> Result<Self, Error> {
        let flat = raw.to_raw().flatten(true);
        let pulses = &flat
            .packets
            .first()
            .ok_or_else(|| Error::decode("No data"))?
            .pulses;
        if pulses.is_empty() {
            return Err(Error::decode("No data"));
        }

        let max_mark = pulses.iter().step_by(2).copied().max().unwrap_or(0);
        let pause = max_mark * 4;

        let mut table = params::resolve(specs(), BTreeMap::new(), false)?;
        let mut bit_time_samples: Vec<i64> = Vec::new();
        let mut packet_interval_samples: Vec<i64> = Vec::new();
        let mut frames: Vec<(u8, u8, u8)> = Vec::new();
        let mut p = 0usize;
        let mut last_packet_length: Option<i64> = None;

        while p < pulses.len().saturating_sub(1) {
            let packet_start = p;
            while p < pulses.len().saturating_sub(1) {
                let (_, space) = (pulses[p], pulses[p + 1]);
                p += 2;
                if space > pause {
                    break;
                }
            }

            let mut times: Vec<i64> = pulses[packet_start..p - 1].to_vec();
            times.sort_unstable();

            if times.len() < 13 {
                return Err(Error::decode("Packet too short"));
            }
            if times.len() > 29 {
                return Err(Error::decode("Packet too long"));
            }

            let min_time = *times[1..].iter().min().unwrap() as f64;
            let max_time = *times[..times.len() - 1].iter().max().unwrap() as f64;
            let mut threshold = (min_time + max_time) / 2.0;
            if max_time / min_time < 1.3 {
                if times.len() <= 15 {
                    threshold *= 0.75;
                } else if times.len() >= 25 {
                    threshold *= 1.5;
                }
            }

            let mut bits: Vec<u8> = vec![1];
            let mut skip = false;
            for &t in &pulses[packet_start..p - 1] {
                if t as f64 > threshold {
                    if skip {
                        return Err(Error::decode("Invalid Manchester encoding"));
                    }
                    bit_time_samples.push(t / 2);
                    let prev = *bits.last().unwrap();
                    bits.push(prev ^ 1);
                } else {
                    bit_time_samples.push(t);
                    if skip {
                        skip = false;
                    } else {
                        let prev = *bits.last().unwrap();
                        bits.push(prev);
                        skip = true;
                    }
                }
            }

            if !(14..=16).contains(&bits.len()) {
                return Err(Error::decode(format!(
                    "Packet length invalid: {}",
                    bits.len()
                )));
            }
            bits.truncate(14);

            let toggle = bits[2];
            let addr = from_bits_msb(&bits[3..8]) as u8;
            let mut cmd_bits = vec![1 ^ bits[1]];
            cmd_bits.extend_from_slice(&bits[8..14]);
            let cmd = from_bits_msb(&cmd_bits) as u8;
            frames.push((toggle, addr, cmd));

            if let Some(len) = last_packet_length {
                packet_interval_samples.push(len);
            }
            last_packet_length = Some(pulses[packet_start..p].iter().sum());
        }

        if !bit_time_samples.is_empty() {
            let mean =
                bit_time_samples.iter().sum::<i64>() as f64 / bit_time_samples.len() as f64;
            table[BIT_TIME] = mean.round() as i64;
        }
        if !packet_interval_samples.is_empty() {
            let mean = packet_interval_samples.iter().sum::<i64>() as f64
                / packet_interval_samples.len() as f64;
            table[PACKET_INTERVAL] = mean.round() as i64;
        }

        log::debug!(
            "rc5: decoded {} frame(s), bit_time={}",
            frames.len(),
            table[BIT_TIME]
        );

        let count = if frames.windows(2).all(|w| w[0] == w[1]) && !frames.is_empty() {
            frames.len() as i64
        } else {
            1
        };
        let kept_frames: Vec<(u8, u8, u8)> = if count > 1 {
            vec![frames[0]]
        } else {
            frames
        };

        let packets = kept_frames
            .into_iter()
            .map(|(_, addr, cmd)| Rc5Packet { addr, cmd })
            .collect();

        Ok(Rc5Code {
            fc: flat.fc,
            count,
            table,
            packets,
        })
    }
}

fn parse_int(s: &str) -> Result<u8, Error> {
    let s = s.trim();
    let v = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        s.parse::<i64>()
    }
    .map_err(|_| Error::parse(format!("Invalid integer: {s:?}")))?;
    u8::try_from(v).map_err(|_| Error::parse(format!("Value out of range: {v}")))
}

fn translate_short_to_long(mut short: BTreeMap<String, i64>) -> BTreeMap<String, i64> {
    let mut long = BTreeMap::new();
    for spec in specs() {
        if let Some(v) = short.remove(spec.short) {
            long.insert(spec.long.to_string(), v);
        }
    }
    long.extend(short);
    long
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip_recovers_address_and_command() {
        let code = Rc5Code::new(
            38000,
            1,
            BTreeMap::new(),
            vec![Rc5Packet::new(5, 35).unwrap()],
        )
        .unwrap();
        let raw = code.to_raw(None).unwrap();
        let decoded = Rc5Code::from_code(&raw).unwrap();
        assert_eq!(decoded.packets, vec![Rc5Packet::new(5, 35).unwrap()]);
    }

    #[test]
    fn toggle_bit_flips_and_persists_across_encode_state() {
        let code = Rc5Code::new(
            38000,
            1,
            BTreeMap::new(),
            vec![Rc5Packet::new(1, 1).unwrap()],
        )
        .unwrap();
        let mut state = EncodeState::new();
        let first = code.to_raw(Some(&mut state)).unwrap();
        let second = code.to_raw(Some(&mut state)).unwrap();
        assert_ne!(first.packets[0].pulses, second.packets[0].pulses);
    }

    #[test]
    fn identical_consecutive_frames_collapse_into_count() {
        let code = Rc5Code::new(
            38000,
            2,
            BTreeMap::new(),
            vec![Rc5Packet::new(5, 35).unwrap()],
        )
        .unwrap();
        let raw = code.to_raw(None).unwrap();
        let decoded = Rc5Code::from_code(&raw).unwrap();
        assert_eq!(decoded.count, 2);
        assert_eq!(decoded.packets.len(), 1);
    }

    #[test]
    fn text_round_trip() {
        let code = Rc5Code::new(
            38000,
            1,
            BTreeMap::new(),
            vec![Rc5Packet::new(5, 35).unwrap()],
        )
        .unwrap();
        let text = code.to_string_code();
        let (_, body) = text.split_once(':').unwrap();
        let reparsed = Rc5Code::from_string(body).unwrap();
        assert_eq!(reparsed, code);
    }

    #[test]
    fn rejects_address_out_of_range() {
        assert!(Rc5Packet::new(32, 0).is_err());
    }

    #[test]
    fn text_and_struct_round_trip_carry_a_non_default_count() {
        let code = Rc5Code::new(
            38000,
            4,
            BTreeMap::new(),
            vec![Rc5Packet::new(5, 35).unwrap()],
        )
        .unwrap();

        let text = code.to_string_code();
        let (_, body) = text.split_once(':').unwrap();
        let reparsed = Rc5Code::from_string(body).unwrap();
        assert_eq!(reparsed.count, 4);

        let value = code.to_struct();
        let reparsed = Rc5Code::from_struct(&value).unwrap();
        assert_eq!(reparsed.count, 4);
    }
}
