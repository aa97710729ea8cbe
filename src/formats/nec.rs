//! NEC-family pulse-distance codec: preamble, LSB-first bytes, optional
//! complement bytes, optional checksum, optional leading burst and repeat
//! frames.

use std::collections::BTreeMap;
use std::convert::TryFrom;

use num_enum::TryFromPrimitive;

use crate::code;
use crate::error::Error;
use crate::params::{self, ParamSpec};
use crate::pulse::{from_bits_lsb, to_bits_lsb};
use crate::raw::{RawCode, RawPacket};

/// How address/data bytes are complemented. Stored in the parameter table
/// as a plain integer; this is the typed view of it for callers.
#[repr(i64)]
#[derive(TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplementMode {
    None = 0,
    Data = 1,
    Address = 2,
    Both = 3,
}

/// Trailing checksum byte scheme, if any.
#[repr(i64)]
#[derive(TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    None = 0,
    Sum = 1,
    Xor = 2,
}

const PULSE_TIME: usize = 0;
const SPACE_TIME_0: usize = 1;
const SPACE_TIME_1: usize = 2;
const PREAMBLE_TIME_HIGH: usize = 3;
const PREAMBLE_TIME_LOW: usize = 4;
const REPEAT_TIME_HIGH: usize = 5;
const REPEAT_TIME_LOW: usize = 6;
const COMPLEMENT_MODE: usize = 7;
const ADDRESS_BYTES: usize = 8;
const PACKET_GAP: usize = 9;
const PACKET_INTERVAL: usize = 10;
const REPEAT_INTERVAL: usize = 11;
const BURST_COUNT: usize = 12;
const BURST_TIME_HIGH: usize = 13;
const BURST_TIME_LOW: usize = 14;
const BURST_GAP: usize = 15;
const CHECKSUM_TYPE: usize = 16;

fn validate_range(lo: i64, hi: i64) -> impl Fn(i64) -> Result<i64, Error> {
    move |v| {
        if (lo..=hi).contains(&v) {
            Ok(v)
        } else {
            Err(Error::data(format!(
                "Value {v} out of range [{lo}, {hi}]"
            )))
        }
    }
}

fn validate_complement_mode(v: i64) -> Result<i64, Error> {
    validate_range(0, 3)(v)
}

fn validate_checksum_type(v: i64) -> Result<i64, Error> {
    validate_range(0, 2)(v)
}

fn validate_address_bytes(v: i64) -> Result<i64, Error> {
    if v >= -1 {
        Ok(v)
    } else {
        Err(Error::data(format!("Invalid address_bytes: {v}")))
    }
}

fn specs() -> &'static [ParamSpec] {
    static SPECS: &[ParamSpec] = &[
        ParamSpec {
            long: "pulse_time",
            short: "tp",
            validate: params::no_validation,
            default: |_| 563,
        },
        ParamSpec {
            long: "space_time_0",
            short: "t0",
            validate: params::no_validation,
            default: |t| t[PULSE_TIME],
        },
        ParamSpec {
            long: "space_time_1",
            short: "t1",
            validate: params::no_validation,
            default: |t| t[PULSE_TIME] * 3,
        },
        ParamSpec {
            long: "preamble_time_high",
            short: "ph",
            validate: params::no_validation,
            default: |t| t[PULSE_TIME] * 16,
        },
        ParamSpec {
            long: "preamble_time_low",
            short: "pl",
            validate: params::no_validation,
            default: |t| t[PREAMBLE_TIME_HIGH] / 2,
        },
        ParamSpec {
            long: "repeat_time_high",
            short: "rh",
            validate: params::no_validation,
            default: |t| t[PREAMBLE_TIME_HIGH],
        },
        ParamSpec {
            long: "repeat_time_low",
            short: "rl",
            validate: params::no_validation,
            default: |t| t[PREAMBLE_TIME_LOW] / 2,
        },
        ParamSpec {
            long: "complement_mode",
            short: "cm",
            validate: validate_complement_mode,
            default: |_| 0,
        },
        ParamSpec {
            long: "address_bytes",
            short: "a",
            validate: validate_address_bytes,
            default: |t| [-1i64, 2, 2, 1][t[COMPLEMENT_MODE] as usize],
        },
        ParamSpec {
            long: "packet_gap",
            short: "pg",
            validate: params::no_validation,
            default: |_| 0,
        },
        ParamSpec {
            long: "packet_interval",
            short: "pi",
            validate: params::no_validation,
            default: |t| {
                if t[PACKET_GAP] == 0 {
                    t[PULSE_TIME] * 192
                } else {
                    0
                }
            },
        },
        ParamSpec {
            long: "repeat_interval",
            short: "ri",
            validate: params::no_validation,
            default: |t| t[PACKET_INTERVAL],
        },
        ParamSpec {
            long: "burst_count",
            short: "b",
            validate: params::no_validation,
            default: |_| 0,
        },
        ParamSpec {
            long: "burst_time_high",
            short: "bh",
            validate: params::no_validation,
            default: |t| t[PULSE_TIME],
        },
        ParamSpec {
            long: "burst_time_low",
            short: "bl",
            validate: params::no_validation,
            default: |t| t[PULSE_TIME],
        },
        ParamSpec {
            long: "burst_gap",
            short: "bg",
            validate: params::no_validation,
            default: |t| t[PULSE_TIME] * 60,
        },
        ParamSpec {
            long: "checksum_type",
            short: "cs",
            validate: validate_checksum_type,
            default: |_| 0,
        },
    ];
    SPECS
}

/// Typed NEC code: a fixed parameter table plus a payload of logical data
/// byte lists (address bytes followed by data bytes, with complement and
/// checksum bytes *not* present — those are derived at encode time and
/// stripped back out at decode time).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NecCode {
    pub fc: i64,
    pub count: i64,
    table: Vec<i64>,
    pub packets: Vec<Vec<u8>>,
}

impl NecCode {
    pub const NAMES: &'static [&'static str] = &["nec"];

    pub fn pulse_time(&self) -> i64 {
        self.table[PULSE_TIME]
    }
    pub fn space_time_0(&self) -> i64 {
        self.table[SPACE_TIME_0]
    }
    pub fn space_time_1(&self) -> i64 {
        self.table[SPACE_TIME_1]
    }
    pub fn preamble_time_high(&self) -> i64 {
        self.table[PREAMBLE_TIME_HIGH]
    }
    pub fn preamble_time_low(&self) -> i64 {
        self.table[PREAMBLE_TIME_LOW]
    }
    pub fn repeat_time_high(&self) -> i64 {
        self.table[REPEAT_TIME_HIGH]
    }
    pub fn repeat_time_low(&self) -> i64 {
        self.table[REPEAT_TIME_LOW]
    }
    pub fn complement_mode(&self) -> i64 {
        self.table[COMPLEMENT_MODE]
    }
    pub fn complement_mode_enum(&self) -> ComplementMode {
        ComplementMode::try_from(self.table[COMPLEMENT_MODE])
            .expect("complement_mode was validated against 0..=3 at construction")
    }
    pub fn address_bytes(&self) -> i64 {
        self.table[ADDRESS_BYTES]
    }
    pub fn packet_gap(&self) -> i64 {
        self.table[PACKET_GAP]
    }
    pub fn packet_interval(&self) -> i64 {
        self.table[PACKET_INTERVAL]
    }
    pub fn repeat_interval(&self) -> i64 {
        self.table[REPEAT_INTERVAL]
    }
    pub fn burst_count(&self) -> i64 {
        self.table[BURST_COUNT]
    }
    pub fn burst_time_high(&self) -> i64 {
        self.table[BURST_TIME_HIGH]
    }
    pub fn burst_time_low(&self) -> i64 {
        self.table[BURST_TIME_LOW]
    }
    pub fn burst_gap(&self) -> i64 {
        self.table[BURST_GAP]
    }
    pub fn checksum_type(&self) -> i64 {
        self.table[CHECKSUM_TYPE]
    }
    pub fn checksum_type_enum(&self) -> ChecksumType {
        ChecksumType::try_from(self.table[CHECKSUM_TYPE])
            .expect("checksum_type was validated against 0..=2 at construction")
    }

    pub fn new(
        fc: i64,
        count: i64,
        overrides: BTreeMap<String, i64>,
        packets: Vec<Vec<u8>>,
    ) -> Result<Self, Error> {
        let table = params::resolve(specs(), overrides, false)?;
        Ok(NecCode {
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
            .map(|p| Self::format_one_packet(p))
            .collect::<Vec<_>>()
            .join(";");
        code::format_text_with_base(Self::NAMES[0], self.fc, self.count, specs(), &self.table, &data)
    }

    pub fn from_struct(value: &serde_json::Value) -> Result<Self, Error> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::data("NEC struct form must be an object"))?;
        let mut overrides = code::struct_param_overrides(object)?;
        let fc = overrides.remove("fc").unwrap_or(38000);
        let count = overrides.remove("count").unwrap_or(1);
        let data = object
            .get("data")
            .ok_or_else(|| Error::data("No data in struct"))?;
        let packets = data
            .as_array()
            .ok_or_else(|| Error::data("NEC data must be a list of byte lists"))?
            .iter()
            .map(|packet| {
                packet
                    .as_array()
                    .ok_or_else(|| Error::data("NEC packet must be a list of bytes"))?
                    .iter()
                    .map(|b| {
                        let n = b
                            .as_i64()
                            .ok_or_else(|| Error::data("NEC byte must be an integer"))?;
                        if !(0..=255).contains(&n) {
                            return Err(Error::data(format!("Invalid data byte: {n}")));
                        }
                        Ok(n as u8)
                    })
                    .collect::<Result<Vec<u8>, Error>>()
            })
            .collect::<Result<Vec<Vec<u8>>, Error>>()?;
        Self::new(fc, count, overrides, packets)
    }

    pub fn to_struct(&self) -> serde_json::Value {
        let data = serde_json::Value::Array(
            self.packets
                .iter()
                .map(|packet| {
                    serde_json::Value::Array(
                        packet
                            .iter()
                            .map(|&b| serde_json::Value::from(b as i64))
                            .collect(),
                    )
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

    fn parse_data(data: &str) -> Result<Vec<Vec<u8>>, Error> {
        data.split(';').map(Self::parse_one_packet).collect()
    }

    fn parse_one_packet(s: &str) -> Result<Vec<u8>, Error> {
        s.split(',')
            .map(|tok| {
                u8::from_str_radix(tok.trim(), 16)
                    .map_err(|_| Error::parse(format!("Invalid data byte: {tok:?}")))
            })
            .collect()
    }

    fn format_one_packet(packet: &[u8]) -> String {
        packet
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn encode_packet(&self, packet: &[u8]) -> Result<(i64, Vec<i64>), Error> {
        let (addr, data): (&[u8], &[u8]) = if self.address_bytes() < 0 {
            (&[], packet)
        } else {
            let ab = self.address_bytes() as usize;
            if ab > packet.len() {
                return Err(Error::encode(format!(
                    "Packet {packet:?} shorter than address_bytes={ab}"
                )));
            }
            packet.split_at(ab)
        };

        let complement_addr = matches!(self.complement_mode(), 2 | 3);
        let complement_data = matches!(self.complement_mode(), 1 | 3);

        let mut bytes = Vec::with_capacity(packet.len() * 2 + 1);
        for &b in addr {
            bytes.push(b);
            if complement_addr {
                bytes.push(b ^ 0xff);
            }
        }
        for &b in data {
            bytes.push(b);
            if complement_data {
                bytes.push(b ^ 0xff);
            }
        }
        match self.checksum_type() {
            1 => bytes.push(data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))),
            2 => bytes.push(data.iter().fold(0u8, |acc, b| acc ^ b)),
            _ => {}
        }

        let mut pulses = vec![self.preamble_time_high(), self.preamble_time_low()];
        for byte in bytes {
            for bit in to_bits_lsb(byte as u32, 8) {
                pulses.push(self.pulse_time());
                pulses.push(if bit == 1 {
                    self.space_time_1()
                } else {
                    self.space_time_0()
                });
            }
        }
        pulses.push(self.pulse_time());
        pulses.push(self.pulse_time().max(self.packet_gap()));

        Ok((1, pulses))
    }

    pub fn to_raw(&self) -> Result<RawCode, Error> {
        let mut encoded = Vec::with_capacity(self.packets.len());
        for packet in &self.packets {
            encoded.push(self.encode_packet(packet)?);
        }
        let mut raw = code::assemble_raw(encoded, self.fc, self.count, self.packet_interval())?;

        if self.burst_count() > 0 {
            let mut burst = Vec::with_capacity(2 * self.burst_count() as usize);
            for _ in 0..self.burst_count() {
                burst.push(self.burst_time_high());
                burst.push(self.burst_time_low());
            }
            let last = burst.len() - 1;
            burst[last] = self.burst_gap();
            raw.packets.insert(0, RawPacket::new(burst)?);
        }

        if self.count > 1 {
            let body =
                self.repeat_time_high() + self.repeat_time_low() + self.pulse_time();
            let gap = self.pulse_time().max(self.repeat_interval() - body);
            let pulses = vec![
                self.repeat_time_high(),
                self.repeat_time_low(),
                self.pulse_time(),
                gap,
            ];
            raw.packets
                .push(RawPacket::with_count(pulses, self.count - 1)?);
            raw.count = 1;
        }

        Ok(raw)
    }

    pub fn from_code(raw: &RawCode) -> Result<Self, Error> {
        let flat = raw.to_raw().flatten(true);
        let pulses = &flat
            .packets
            .first()
            .ok_or_else(|| Error::decode("No data"))?
            .pulses;

        let mut table = params::resolve(specs(), BTreeMap::new(), false)?;
        let mut sampler = Sampler::default();
        let mut p = 0usize;

        if pulses.len() >= 4 {
            let bavg = (pulses[0] + pulses[1] + pulses[2] + pulses[3]) as f64 / 4.0;
            let bmin = *pulses[1..4].iter().min().unwrap() as f64;
            let bmax = *pulses[0..4].iter().max().unwrap() as f64;
            if (pulses[0] as f64) < bavg * 1.5
                && ((bmin - bavg).abs() / bavg) < 0.3
                && ((bmax - bavg) / bavg) < 0.3
            {
                let mut burst_count = 0i64;
                while p < pulses.len().saturating_sub(1) {
                    let (bh, bl) = (pulses[p], pulses[p + 1]);
                    if bh as f64 > 2.0 * bavg {
                        sampler.sample(&mut table, BURST_GAP, pulses[p - 1]);
                        break;
                    }
                    sampler.sample(&mut table, BURST_TIME_HIGH, bh);
                    burst_count += 1;
                    p += 2;
                    if bl as f64 > 2.0 * bavg {
                        sampler.sample(&mut table, BURST_GAP, bl);
                        break;
                    }
                    sampler.sample(&mut table, BURST_TIME_LOW, bl);
                }
                table[BURST_COUNT] = burst_count;
                log::trace!("nec: sampled leading burst of {burst_count} pulses");
            }
        }

        if pulses.len() <= p {
            return Err(Error::decode("No data"));
        }

        let mut packets: Vec<Vec<u8>> = Vec::new();
        let mut repeats = 0i64;
        let mut last_packet_length: Option<i64> = None;

        while p < pulses.len().saturating_sub(1) {
            let packet_start = p;
            let (hh, hl) = (pulses[p], pulses[p + 1]);
            p += 2;

            if p >= pulses.len() {
                if packets.is_empty() {
                    return Err(Error::decode("No data"));
                }
                break;
            }

            if !packets.is_empty() && repeats == 0 {
                sampler.sample(&mut table, PACKET_GAP, pulses[p - 3]);
            }

            let mut bits: Vec<u8> = Vec::new();
            while p < pulses.len().saturating_sub(1) {
                let (mark, space) = (pulses[p], pulses[p + 1]);
                if (!bits.is_empty() || !packets.is_empty())
                    && mark > table[PULSE_TIME] * 2
                {
                    break;
                }
                p += 2;
                sampler.sample(&mut table, PULSE_TIME, mark);
                if space < table[PULSE_TIME] * 2 {
                    bits.push(0);
                    sampler.sample(&mut table, SPACE_TIME_0, space);
                } else if space < table[PULSE_TIME] * 6 {
                    bits.push(1);
                    sampler.sample(&mut table, SPACE_TIME_1, space);
                } else {
                    bits.push(0);
                    break;
                }
            }

            if bits.len() % 8 != 1 {
                return Err(Error::decode("Bit count not an even number of bytes"));
            }

            if bits.len() > 1 {
                sampler.sample(&mut table, PREAMBLE_TIME_HIGH, hh);
                sampler.sample(&mut table, PREAMBLE_TIME_LOW, hl);
                if repeats > 0 {
                    return Err(Error::decode("Data packet after a repeat packet"));
                }
                let bytes: Vec<u8> = bits[..bits.len() - 1]
                    .chunks(8)
                    .map(|chunk| from_bits_lsb(chunk) as u8)
                    .collect();
                packets.push(bytes);
                if let Some(len) = last_packet_length {
                    sampler.sample(&mut table, PACKET_INTERVAL, len);
                }
            } else {
                sampler.sample(&mut table, REPEAT_TIME_HIGH, hh);
                sampler.sample(&mut table, REPEAT_TIME_LOW, hl);
                if packets.is_empty() {
                    return Err(Error::decode("Repeat packet with no data packet"));
                }
                if repeats > 0 {
                    if let Some(len) = last_packet_length {
                        sampler.sample(&mut table, REPEAT_INTERVAL, len);
                    }
                } else if let Some(len) = last_packet_length {
                    sampler.sample(&mut table, PACKET_INTERVAL, len);
                }
                repeats += 1;
            }

            last_packet_length = Some(pulses[packet_start..p].iter().sum());
        }

        // Packet spacing can be sampled as either an interval (packet-start to
        // packet-start) or a gap (space before each preamble). Keep whichever
        // sampled more consistently; with only two packets, prefer the gap.
        if sampler.has(PACKET_INTERVAL) && sampler.has(PACKET_GAP) {
            let vi = sampler.samples(PACKET_INTERVAL);
            let vg = sampler.samples(PACKET_GAP);
            if vi.len() > 1 && vg.len() > 1 {
                if variance(vi) > variance(vg) {
                    sampler.forget(PACKET_INTERVAL);
                } else {
                    sampler.forget(PACKET_GAP);
                }
            } else {
                sampler.forget(PACKET_INTERVAL);
            }
        }

        if !sampler.has(PACKET_GAP) {
            table[PACKET_GAP] = 0;
        }
        if !sampler.has(PACKET_INTERVAL) {
            table[PACKET_INTERVAL] = if table[PACKET_GAP] == 0 {
                table[PULSE_TIME] * 192
            } else {
                0
            };
        }
        if !sampler.has(REPEAT_INTERVAL) {
            table[REPEAT_INTERVAL] = table[PACKET_INTERVAL];
        }
        if !sampler.has(REPEAT_TIME_HIGH) {
            table[REPEAT_TIME_HIGH] = table[PREAMBLE_TIME_HIGH];
        }
        if !sampler.has(REPEAT_TIME_LOW) {
            table[REPEAT_TIME_LOW] = table[PREAMBLE_TIME_LOW] / 2;
        }
        if !sampler.has(BURST_TIME_HIGH) {
            table[BURST_TIME_HIGH] = table[PULSE_TIME];
        }
        if !sampler.has(BURST_TIME_LOW) {
            table[BURST_TIME_LOW] = table[PULSE_TIME];
        }
        if !sampler.has(BURST_GAP) {
            table[BURST_GAP] = table[PULSE_TIME] * 60;
        }

        if packets.is_empty() {
            return Err(Error::decode("No data"));
        }

        let (complement_mode, address_bytes) = classify_structure(&packets);
        table[COMPLEMENT_MODE] = complement_mode;
        table[ADDRESS_BYTES] = address_bytes;
        log::debug!(
            "nec: classified complement_mode={complement_mode} address_bytes={address_bytes}"
        );

        let stripped = strip_complements(&packets, complement_mode, address_bytes);
        let addr_len = address_bytes.max(0) as usize;
        let checksum_type = detect_checksum(&stripped, addr_len);
        table[CHECKSUM_TYPE] = checksum_type;
        log::debug!("nec: classified checksum_type={checksum_type}");

        let final_packets = if checksum_type != 0 {
            stripped
                .into_iter()
                .map(|mut p| {
                    p.pop();
                    p
                })
                .collect()
        } else {
            stripped
        };

        Ok(NecCode {
            fc: flat.fc,
            count: repeats + 1,
            table,
            packets: final_packets,
        })
    }
}

/// Maps each recognized short parameter key to its long name, one-to-one.
/// A key that names no known parameter is passed through verbatim under its
/// original (short) spelling, so [`params::resolve`]'s unknown-key check —
/// which only ever consumes long names — rejects it instead of silently
/// dropping it.
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

#[derive(Default)]
struct Sampler {
    samples: std::collections::HashMap<usize, Vec<i64>>,
    forgotten: std::collections::HashSet<usize>,
}

impl Sampler {
    fn sample(&mut self, table: &mut [i64], idx: usize, value: i64) {
        let entries = self.samples.entry(idx).or_default();
        entries.push(value);
        let mean = entries.iter().sum::<i64>() as f64 / entries.len() as f64;
        table[idx] = mean.round() as i64;
        log::trace!("nec: sampled index {idx} = {value} (running mean {})", table[idx]);
    }

    fn has(&self, idx: usize) -> bool {
        self.samples.contains_key(&idx) && !self.forgotten.contains(&idx)
    }

    fn samples(&self, idx: usize) -> Vec<f64> {
        self.samples
            .get(&idx)
            .map(|v| v.iter().map(|&x| x as f64).collect())
            .unwrap_or_default()
    }

    fn forget(&mut self, idx: usize) {
        self.forgotten.insert(idx);
    }
}

fn variance(values: Vec<f64>) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

fn head_complement_pairs(packet: &[u8]) -> usize {
    let mut pairs = 0;
    let mut i = 0;
    while i + 1 < packet.len() && packet[i] == packet[i + 1] ^ 0xff {
        pairs += 1;
        i += 2;
    }
    pairs
}

fn head_noncomplement_len(packet: &[u8]) -> usize {
    let n = packet.len();
    let mut i = n;
    while i >= 2 && packet[i - 2] == packet[i - 1] ^ 0xff {
        i -= 2;
    }
    n - i
}

fn classify_structure(packets: &[Vec<u8>]) -> (i64, i64) {
    let head_complements: Vec<usize> = packets.iter().map(|p| head_complement_pairs(p)).collect();
    let head_noncomplements: Vec<usize> =
        packets.iter().map(|p| head_noncomplement_len(p)).collect();

    let all_fully_paired = packets
        .iter()
        .zip(&head_complements)
        .all(|(p, hc)| 2 * hc == p.len());

    let (mode, addr) = if all_fully_paired {
        let min_hc = *head_complements.iter().min().unwrap_or(&0) as i64;
        (3, min_hc.clamp(0, 2))
    } else if *head_complements.iter().min().unwrap_or(&0) > 1 {
        (2, *head_complements.iter().min().unwrap() as i64)
    } else if *head_noncomplements.iter().max().unwrap_or(&0) > 1 {
        (1, *head_noncomplements.iter().max().unwrap() as i64)
    } else {
        (0, -1)
    };

    let region_ok = packets.iter().all(|p| {
        let needed = match mode {
            3 => 2 * (addr.max(0) as usize + 1),
            2 => 2 * addr as usize,
            1 => addr as usize,
            _ => 0,
        };
        p.len() >= needed
    });

    if region_ok {
        (mode, addr)
    } else {
        (0, -1)
    }
}

fn strip_complements(packets: &[Vec<u8>], mode: i64, address_bytes: i64) -> Vec<Vec<u8>> {
    packets
        .iter()
        .map(|packet| match mode {
            3 => packet.iter().step_by(2).copied().collect(),
            2 => {
                let boundary = 2 * address_bytes.max(0) as usize;
                let boundary = boundary.min(packet.len());
                let mut out: Vec<u8> = packet[..boundary].iter().step_by(2).copied().collect();
                out.extend_from_slice(&packet[boundary..]);
                out
            }
            1 => {
                let boundary = (address_bytes.max(0) as usize).min(packet.len());
                let mut out = packet[..boundary].to_vec();
                out.extend(packet[boundary..].iter().step_by(2).copied());
                out
            }
            _ => packet.clone(),
        })
        .collect()
}

fn detect_checksum(packets: &[Vec<u8>], addr_len: usize) -> i64 {
    let sum_ok = packets.iter().all(|p| {
        p.len() > addr_len + 1 && {
            let body = &p[addr_len..p.len() - 1];
            body.iter().fold(0u8, |a, b| a.wrapping_add(*b)) == p[p.len() - 1]
        }
    });
    if sum_ok {
        return 1;
    }
    let xor_ok = packets.iter().all(|p| {
        p.len() > addr_len + 1 && {
            let body = &p[addr_len..p.len() - 1];
            body.iter().fold(0u8, |a, b| a ^ b) == p[p.len() - 1]
        }
    });
    if xor_ok {
        2
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_classic_nec_matches_known_preamble_and_stop_bit() {
        let code = NecCode::new(
            38000,
            1,
            BTreeMap::new(),
            vec![vec![0x00, 0xff, 0x12, 0xed]],
        )
        .unwrap();
        let raw = code.to_raw().unwrap();
        let pulses = &raw.packets[0].pulses;
        assert_eq!(&pulses[0..4], &[9024, 4512, 563, 563]);
        assert_eq!(pulses[pulses.len() - 2], 563);
    }

    #[test]
    fn decode_recovers_address_split_and_both_complement_mode() {
        let mut overrides = BTreeMap::new();
        overrides.insert("complement_mode".to_string(), 3);
        overrides.insert("address_bytes".to_string(), 2);
        let code = NecCode::new(38000, 1, overrides, vec![vec![0x00, 0x12]]).unwrap();
        let raw = code.to_raw().unwrap();
        let decoded = NecCode::from_code(&raw).unwrap();
        assert_eq!(decoded.complement_mode(), 3);
        assert_eq!(decoded.complement_mode_enum(), ComplementMode::Both);
        assert_eq!(decoded.address_bytes(), 2);
        assert_eq!(decoded.packets, vec![vec![0x00, 0x12]]);
    }

    #[test]
    fn decode_recovers_checksum_type_1() {
        let mut overrides = BTreeMap::new();
        overrides.insert("complement_mode".to_string(), 0);
        overrides.insert("address_bytes".to_string(), -1);
        overrides.insert("checksum_type".to_string(), 1);
        let code = NecCode::new(
            38000,
            1,
            overrides,
            vec![vec![0x01, 0x02, 0x03]],
        )
        .unwrap();
        let raw = code.to_raw().unwrap();
        let decoded = NecCode::from_code(&raw).unwrap();
        assert_eq!(decoded.checksum_type(), 1);
        assert_eq!(decoded.checksum_type_enum(), ChecksumType::Sum);
        assert_eq!(decoded.packets, vec![vec![0x01, 0x02, 0x03]]);
    }

    #[test]
    fn text_round_trip() {
        let code = NecCode::new(38000, 1, BTreeMap::new(), vec![vec![0x20, 0xdf]]).unwrap();
        let text = code.to_string_code();
        let (typename, body) = text.split_once(':').unwrap();
        assert_eq!(typename, "nec");
        let reparsed = NecCode::from_string(body).unwrap();
        assert_eq!(reparsed, code);
    }

    #[test]
    fn struct_round_trip() {
        let code = NecCode::new(38000, 1, BTreeMap::new(), vec![vec![0x20, 0xdf]]).unwrap();
        let value = code.to_struct();
        let reparsed = NecCode::from_struct(&value).unwrap();
        assert_eq!(reparsed, code);
    }

    #[test]
    fn rejects_unknown_short_parameter() {
        let err = NecCode::from_string("bogus=1:00,ff");
        assert!(err.is_err());
    }

    #[test]
    fn text_and_struct_round_trip_carry_a_non_default_count() {
        let code = NecCode::new(38000, 3, BTreeMap::new(), vec![vec![0x20, 0xdf]]).unwrap();

        let text = code.to_string_code();
        let (_, body) = text.split_once(':').unwrap();
        let reparsed = NecCode::from_string(body).unwrap();
        assert_eq!(reparsed.count, 3);

        let value = code.to_struct();
        let reparsed = NecCode::from_struct(&value).unwrap();
        assert_eq!(reparsed.count, 3);
    }
}
