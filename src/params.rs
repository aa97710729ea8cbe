//! Ordered parameter descriptors shared by every format codec.
//!
//! Every format exposes a fixed, ordered list of parameters, each with a
/// long name (used in struct form and the long-form CLI-adjacent reporting),
//! a short name (used in the `type:k=v,...:data` text grammar), a validator,
//! and a default that may read any *earlier* parameter's resolved value.
//! Resolving the list left-to-right — building up the same table the
//! defaults read from — handles the dependent-default requirement without a
//! macro: each format just lists its descriptors in dependency order.

use std::collections::BTreeMap;

use crate::error::Error;

/// One parameter descriptor. `default` is given the table of already
/// resolved values (indexed the same way as this format's descriptor slice)
/// and must only read indices strictly before its own position.
pub struct ParamSpec {
    pub long: &'static str,
    pub short: &'static str,
    pub validate: fn(i64) -> Result<i64, Error>,
    pub default: fn(&[i64]) -> i64,
}

pub fn no_validation(v: i64) -> Result<i64, Error> {
    Ok(v)
}

/// Resolves a full parameter table from a set of overrides (keyed by either
/// the short or long name, selected by `use_short`), filling in any
/// unmentioned parameter from its default. Rejects leftover unknown keys.
pub fn resolve(
    specs: &[ParamSpec],
    mut overrides: BTreeMap<String, i64>,
    use_short: bool,
) -> Result<Vec<i64>, Error> {
    let mut table = Vec::with_capacity(specs.len());
    for spec in specs {
        let key = if use_short { spec.short } else { spec.long };
        let value = match overrides.remove(key) {
            Some(raw) => (spec.validate)(raw)?,
            None => (spec.default)(&table),
        };
        table.push(value);
    }
    if !overrides.is_empty() {
        let keys: Vec<_> = overrides.keys().cloned().collect();
        return Err(Error::data(format!("Unknown options: {keys:?}")));
    }
    Ok(table)
}

/// Snaps each parameter within `tolerance` of its (recomputed, dependency
/// aware) default back to that default, mutating `table` in place,
/// left-to-right, so later defaults see the already-snapped earlier values.
pub fn simplify(specs: &[ParamSpec], table: &mut [i64], tolerance: f64) {
    for (i, spec) in specs.iter().enumerate() {
        let default = (spec.default)(table);
        if default == 0 {
            continue;
        }
        let lo = default as f64 * (1.0 - tolerance);
        let hi = default as f64 * (1.0 + tolerance);
        let val = table[i] as f64;
        if lo <= val && val <= hi {
            table[i] = default;
        }
    }
}

/// Parameters whose current value differs from its recomputed default,
/// keyed by either short or long name depending on `use_short`.
pub fn non_default_entries(specs: &[ParamSpec], table: &[i64], use_short: bool) -> Vec<(&'static str, i64)> {
    specs
        .iter()
        .enumerate()
        .filter_map(|(i, spec)| {
            let default = (spec.default)(table);
            if table[i] != default {
                let key = if use_short { spec.short } else { spec.long };
                Some((key, table[i]))
            } else {
                None
            }
        })
        .collect()
}

/// Parses the `k=v,k=v,...` short-parameter grammar used by the text form.
/// Each assignment is applied as it is parsed (not after the loop), so an
/// earlier key is never silently dropped in favor of a later one overriding
/// the whole accumulator.
pub fn parse_short_params(options: &str) -> Result<BTreeMap<String, i64>, Error> {
    let mut values = BTreeMap::new();
    for opt in options.split(',') {
        let (k, v) = opt
            .split_once('=')
            .ok_or_else(|| Error::parse(format!("Could not parse option {opt:?}")))?;
        let parsed: i64 = v
            .trim()
            .parse()
            .map_err(|_| Error::parse(format!("Invalid value for {k}: {v:?}")))?;
        values.insert(k.trim().to_string(), parsed);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(default: i64) -> fn(&[i64]) -> i64 {
        // descriptors below never need more than a couple of fixed defaults
        match default {
            0 => |_: &[i64]| 0,
            563 => |_: &[i64]| 563,
            _ => unreachable!(),
        }
    }

    #[test]
    fn resolve_fills_in_defaults_and_applies_overrides() {
        let specs = vec![
            ParamSpec {
                long: "pulse_time",
                short: "tp",
                validate: no_validation,
                default: fixed(563),
            },
            ParamSpec {
                long: "space_time_0",
                short: "t0",
                validate: no_validation,
                default: |table: &[i64]| table[0],
            },
        ];
        let mut overrides = BTreeMap::new();
        overrides.insert("tp".to_string(), 100);
        let table = resolve(&specs, overrides, true).unwrap();
        assert_eq!(table, vec![100, 100]);
    }

    #[test]
    fn resolve_rejects_unknown_keys() {
        let specs = vec![ParamSpec {
            long: "pulse_time",
            short: "tp",
            validate: no_validation,
            default: fixed(563),
        }];
        let mut overrides = BTreeMap::new();
        overrides.insert("bogus".to_string(), 1);
        assert!(resolve(&specs, overrides, true).is_err());
    }

    #[test]
    fn simplify_snaps_within_tolerance_and_cascades() {
        let specs = vec![
            ParamSpec {
                long: "pulse_time",
                short: "tp",
                validate: no_validation,
                default: fixed(563),
            },
            ParamSpec {
                long: "space_time_0",
                short: "t0",
                validate: no_validation,
                default: |table: &[i64]| table[0],
            },
        ];
        // pulse_time is close enough to 563 to snap; space_time_0 then
        // snaps to the *new* pulse_time, not the value it was constructed
        // with.
        let mut table = vec![570, 570];
        simplify(&specs, &mut table, 0.05);
        assert_eq!(table, vec![563, 563]);
    }

    #[test]
    fn parse_short_params_applies_each_pair() {
        let values = parse_short_params("tp=500,t0=500,t1=1500").unwrap();
        assert_eq!(values.get("tp"), Some(&500));
        assert_eq!(values.get("t1"), Some(&1500));
    }
}
