//! The format registry: a fixed, ordered list of the formats this crate
//! understands, and the generic dispatch entry points built on top of it.

pub mod broadlink;
pub mod nec;
pub mod pronto;
pub mod rc5;

use crate::code::EncodeState;
use crate::error::Error;
use crate::raw::RawCode;

use broadlink::BroadlinkCode;
use nec::NecCode;
use pronto::ProntoCode;
use rc5::Rc5Code;

/// Any code this crate knows how to name, parse, and round-trip through
/// [`RawCode`]. One variant per registered format, `Raw` first since it is
/// the universal interchange currency every other format lowers to.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyCode {
    Raw(RawCode),
    Rc5(Rc5Code),
    Nec(NecCode),
    Broadlink(BroadlinkCode),
    Pronto(ProntoCode),
}

impl AnyCode {
    pub fn names(&self) -> &'static [&'static str] {
        match self {
            AnyCode::Raw(_) => RawCode::NAMES,
            AnyCode::Rc5(_) => Rc5Code::NAMES,
            AnyCode::Nec(_) => NecCode::NAMES,
            AnyCode::Broadlink(_) => BroadlinkCode::NAMES,
            AnyCode::Pronto(_) => ProntoCode::NAMES,
        }
    }

    pub fn to_raw(&self) -> Result<RawCode, Error> {
        self.to_raw_with_state(None)
    }

    pub fn to_raw_with_state(&self, mut state: Option<&mut EncodeState>) -> Result<RawCode, Error> {
        match self {
            AnyCode::Raw(c) => Ok(c.to_raw()),
            AnyCode::Rc5(c) => c.to_raw(state.as_deref_mut()),
            AnyCode::Nec(c) => c.to_raw(),
            AnyCode::Broadlink(c) => c.to_raw(),
            AnyCode::Pronto(c) => c.to_raw(),
        }
    }

    pub fn to_string_code(&self) -> String {
        match self {
            AnyCode::Raw(c) => c.to_text(),
            AnyCode::Rc5(c) => c.to_string_code(),
            AnyCode::Nec(c) => c.to_string_code(),
            AnyCode::Broadlink(c) => c.to_string_code(),
            AnyCode::Pronto(c) => c.to_string_code(),
        }
    }

    pub fn to_struct(&self) -> serde_json::Value {
        match self {
            AnyCode::Raw(c) => c.to_struct_value(),
            AnyCode::Rc5(c) => c.to_struct(),
            AnyCode::Nec(c) => c.to_struct(),
            AnyCode::Broadlink(c) => c.to_struct(),
            AnyCode::Pronto(c) => c.to_struct(),
        }
    }

    pub fn simplify_params(&mut self, tolerance: f64) {
        match self {
            AnyCode::Raw(_) => {}
            AnyCode::Rc5(c) => c.simplify_params(tolerance),
            AnyCode::Nec(c) => c.simplify_params(tolerance),
            AnyCode::Broadlink(c) => c.simplify_params(tolerance),
            AnyCode::Pronto(c) => c.simplify_params(tolerance),
        }
    }
}

type DecodeFn = fn(&RawCode) -> Result<AnyCode, Error>;

fn decode_raw(raw: &RawCode) -> Result<AnyCode, Error> {
    Ok(AnyCode::Raw(raw.to_raw()))
}
fn decode_rc5(raw: &RawCode) -> Result<AnyCode, Error> {
    Rc5Code::from_code(raw).map(AnyCode::Rc5)
}
fn decode_nec(raw: &RawCode) -> Result<AnyCode, Error> {
    NecCode::from_code(raw).map(AnyCode::Nec)
}
fn decode_broadlink(raw: &RawCode) -> Result<AnyCode, Error> {
    BroadlinkCode::from_code(raw).map(AnyCode::Broadlink)
}
fn decode_pronto(raw: &RawCode) -> Result<AnyCode, Error> {
    ProntoCode::from_code(raw).map(AnyCode::Pronto)
}

struct FormatEntry {
    names: &'static [&'static str],
    decode: DecodeFn,
}

/// Static, ordered registry backing [`find_format`], [`from_string`],
/// [`from_struct`], and auto-identification's candidate sweep. Immutable
/// after startup; no plugin mechanism — lookup is linear over this short
/// list.
static FORMATS: &[FormatEntry] = &[
    FormatEntry {
        names: RawCode::NAMES,
        decode: decode_raw,
    },
    FormatEntry {
        names: Rc5Code::NAMES,
        decode: decode_rc5,
    },
    FormatEntry {
        names: NecCode::NAMES,
        decode: decode_nec,
    },
    FormatEntry {
        names: BroadlinkCode::NAMES,
        decode: decode_broadlink,
    },
    FormatEntry {
        names: ProntoCode::NAMES,
        decode: decode_pronto,
    },
];

/// The order `try_decode` tries candidate formats in.
pub fn decoders() -> impl Iterator<Item = DecodeFn> {
    FORMATS.iter().map(|f| f.decode)
}

pub fn find_format(name: &str) -> Result<DecodeFn, Error> {
    FORMATS
        .iter()
        .find(|f| f.names.contains(&name))
        .map(|f| f.decode)
        .ok_or_else(|| Error::parse(format!("Unknown format: {name:?}")))
}

/// Parses `type:data` or `type:k=v,...:data` and dispatches to the named
/// format's own text parser.
pub fn from_string(s: &str) -> Result<AnyCode, Error> {
    let (typename, body) = s
        .split_once(':')
        .ok_or_else(|| Error::parse(format!("Code missing type prefix: {s:?}")))?;
    from_named_string(typename, body)
}

/// Parses the `type:params:data` grammar where the type name is already
/// known (the 3-tuple `(format_name, params_string, data)` dispatch shape,
/// and the tail of the 2-argument `type:code` shape).
pub fn from_named_string(typename: &str, body: &str) -> Result<AnyCode, Error> {
    match typename {
        "raw" | "rawpm" => RawCode::parse_text(body).map(AnyCode::Raw),
        "rc5" => Rc5Code::from_string(body).map(AnyCode::Rc5),
        "nec" => NecCode::from_string(body).map(AnyCode::Nec),
        "broadlink" | "b64" => BroadlinkCode::from_string(body).map(AnyCode::Broadlink),
        "pronto" => ProntoCode::from_string(body).map(AnyCode::Pronto),
        other => Err(Error::parse(format!("Unknown format: {other:?}"))),
    }
}

/// Parses the struct-form mapping `{"format": ..., ..., "data": ...}`.
pub fn from_struct(value: &serde_json::Value) -> Result<AnyCode, Error> {
    let format = value
        .get("format")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::data("No format in struct"))?;
    match format {
        "raw" | "rawpm" => RawCode::from_struct_value(value).map(AnyCode::Raw),
        "rc5" => Rc5Code::from_struct(value).map(AnyCode::Rc5),
        "nec" => NecCode::from_struct(value).map(AnyCode::Nec),
        "broadlink" | "b64" => BroadlinkCode::from_struct(value).map(AnyCode::Broadlink),
        "pronto" => ProntoCode::from_struct(value).map(AnyCode::Pronto),
        other => Err(Error::data(format!("Unknown format: {other:?}"))),
    }
}

/// The generic entry point: a text code string, a `(template, data)` pair,
/// a `(format_name, params, data)` triple, or a struct mapping.
pub enum Input<'a> {
    Text(&'a str),
    TypedData(&'a str, &'a str),
    NamedParamsData(&'a str, &'a str, &'a str),
    Struct(&'a serde_json::Value),
}

pub fn decode_input(input: Input<'_>) -> Result<AnyCode, Error> {
    match input {
        Input::Text(s) => from_string(s),
        Input::TypedData(typename, data) => from_named_string(typename, &format!(":{data}")),
        Input::NamedParamsData(typename, params, data) => {
            from_named_string(typename, &format!("{params}:{data}"))
        }
        Input::Struct(value) => from_struct(value),
    }
}
