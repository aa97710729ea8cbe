//! Shared machinery every format codec builds on: assembling `to_raw`
//! output with packet-interval padding, and the text/struct serialization
//! shells around each format's parameter table.

use std::collections::HashMap;

use crate::error::Error;
use crate::params::{self, ParamSpec};
use crate::raw::{RawCode, RawPacket};

/// Caller-owned, caller-serialized scratch state threaded through
/// `encode_packet` calls. Only RC5 currently uses it, to persist a toggle
/// bit per (address, command) across encode invocations.
pub type EncodeState = HashMap<String, i64>;

/// Wraps each payload packet's `(count, pulses)` into a [`RawCode`],
/// padding the final space of every packet up to `packet_interval` once the
/// code as a whole repeats or has more than one packet — the shared half of
/// every format's `to_raw`.
pub fn assemble_raw(
    encoded: Vec<(i64, Vec<i64>)>,
    fc: i64,
    count: i64,
    packet_interval: i64,
) -> Result<RawCode, Error> {
    let multi = count > 1 || encoded.len() > 1;
    let mut packets = Vec::with_capacity(encoded.len());

    for (pcount, mut pulses) in encoded {
        if multi && !pulses.is_empty() {
            let sum: i64 = pulses.iter().sum();
            let pad = (packet_interval - sum).max(0);
            *pulses.last_mut().unwrap() += pad;
        }
        packets.push(RawPacket::with_count(pulses, pcount)?);
    }

    Ok(RawCode {
        packets,
        fc,
        count,
        packet_interval: 0,
    })
}

/// Renders `type[:k=v,...]:data`, omitting the parameter segment's contents
/// (but not its separating colons) when every parameter is at its default.
pub fn format_text(name: &str, specs: &[ParamSpec], table: &[i64], data: &str) -> String {
    let entries = params::non_default_entries(specs, table, true);
    if entries.is_empty() {
        format!("{name}::{data}")
    } else {
        let rendered: Vec<String> = entries.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{name}:{}:{data}", rendered.join(","))
    }
}

/// Splits the text already past the leading `type:` into its `params` and
/// `data` segments. Both a populated and an empty parameter segment are
/// valid (`type::data`); a body with no second colon at all is malformed.
pub fn split_params_and_data(body: &str) -> Result<(&str, &str), Error> {
    body.split_once(':')
        .ok_or_else(|| Error::parse(format!("Code missing data segment: {body:?}")))
}

/// Builds the struct-form `serde_json::Value`: `{"format": ..., <non
/// default long-name params>..., "data": ...}`.
pub fn to_struct_value(
    name: &str,
    specs: &[ParamSpec],
    table: &[i64],
    data: serde_json::Value,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(
        "format".to_string(),
        serde_json::Value::String(name.to_string()),
    );
    for (key, value) in params::non_default_entries(specs, table, false) {
        map.insert(key.to_string(), serde_json::Value::from(value));
    }
    map.insert("data".to_string(), data);
    serde_json::Value::Object(map)
}

/// Like [`format_text`], but also renders the base `fc`/`count` parameters
/// every format inherits (short names `f`/`c`), ahead of the format's own
/// parameters, the same way [`crate::raw::RawCode::to_text`] renders them.
pub fn format_text_with_base(
    name: &str,
    fc: i64,
    count: i64,
    specs: &[ParamSpec],
    table: &[i64],
    data: &str,
) -> String {
    let mut parts = Vec::new();
    if fc != 38000 {
        parts.push(format!("f={fc}"));
    }
    if count != 1 {
        parts.push(format!("c={count}"));
    }
    parts.extend(
        params::non_default_entries(specs, table, true)
            .iter()
            .map(|(k, v)| format!("{k}={v}")),
    );
    if parts.is_empty() {
        format!("{name}::{data}")
    } else {
        format!("{name}:{}:{data}", parts.join(","))
    }
}

/// Like [`to_struct_value`], but also carries `fc`/`count` under their long
/// names when they differ from the base defaults.
pub fn to_struct_value_with_base(
    name: &str,
    fc: i64,
    count: i64,
    specs: &[ParamSpec],
    table: &[i64],
    data: serde_json::Value,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(
        "format".to_string(),
        serde_json::Value::String(name.to_string()),
    );
    if fc != 38000 {
        map.insert("fc".to_string(), serde_json::Value::from(fc));
    }
    if count != 1 {
        map.insert("count".to_string(), serde_json::Value::from(count));
    }
    for (key, value) in params::non_default_entries(specs, table, false) {
        map.insert(key.to_string(), serde_json::Value::from(value));
    }
    map.insert("data".to_string(), data);
    serde_json::Value::Object(map)
}

/// Pulls every key but `format` and `data` out of a struct-form object into
/// an override table keyed by long parameter name, validating that each
/// value is an integer.
pub fn struct_param_overrides(
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<std::collections::BTreeMap<String, i64>, Error> {
    let mut overrides = std::collections::BTreeMap::new();
    for (key, value) in object {
        if key == "format" || key == "data" {
            continue;
        }
        let int_value = value
            .as_i64()
            .ok_or_else(|| Error::data(format!("Parameter {key:?} must be an integer")))?;
        overrides.insert(key.clone(), int_value);
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_raw_pads_only_when_code_repeats_or_has_multiple_packets() {
        let single = assemble_raw(vec![(1, vec![100, 100])], 38000, 1, 1000).unwrap();
        assert_eq!(single.packets[0].pulses, vec![100, 100]);

        let repeating = assemble_raw(vec![(1, vec![100, 100])], 38000, 2, 1000).unwrap();
        assert_eq!(repeating.packets[0].pulses, vec![100, 900]);

        let multi_packet = assemble_raw(
            vec![(1, vec![100, 100]), (1, vec![200, 200])],
            38000,
            1,
            1000,
        )
        .unwrap();
        assert_eq!(multi_packet.packets[0].pulses, vec![100, 900]);
        assert_eq!(multi_packet.packets[1].pulses, vec![200, 800]);
    }

    #[test]
    fn format_text_omits_empty_param_segment_but_keeps_colon() {
        let specs: Vec<ParamSpec> = vec![];
        assert_eq!(format_text("nec", &specs, &[], "00,ff"), "nec::00,ff");
    }

    #[test]
    fn split_params_and_data_rejects_missing_data_segment() {
        assert!(split_params_and_data("no-colon-here").is_err());
        assert_eq!(split_params_and_data(":00,ff").unwrap(), ("", "00,ff"));
    }
}
