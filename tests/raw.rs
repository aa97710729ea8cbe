use anyhow::Result;
use ircode::formats::{self, AnyCode, Input};
use ircode::raw::{RawCode, RawPacket};

#[test]
fn raw_text_round_trips_through_generic_entry_point() -> Result<()> {
    let code = RawCode {
        packets: vec![RawPacket::new(vec![9024, 4512, 563, 1687])?],
        fc: 38000,
        count: 1,
        packet_interval: 0,
    };
    let text = code.to_text();
    let AnyCode::Raw(reparsed) = formats::from_string(&text)? else {
        panic!("expected raw");
    };
    assert_eq!(reparsed, code);
    Ok(())
}

#[test]
fn generic_dispatch_accepts_typed_data_tuple() -> Result<()> {
    let decoded = formats::decode_input(Input::TypedData("nec", "20,df"))?;
    let AnyCode::Nec(nec) = decoded else {
        panic!("expected nec");
    };
    assert_eq!(nec.packets, vec![vec![0x20, 0xdf]]);
    Ok(())
}

#[test]
fn generic_dispatch_accepts_struct_form() -> Result<()> {
    let value = serde_json::json!({
        "format": "raw",
        "data": "9024,4512,563,1687",
    });
    let decoded = formats::decode_input(Input::Struct(&value))?;
    let AnyCode::Raw(raw) = decoded else {
        panic!("expected raw");
    };
    assert_eq!(raw.packets[0].pulses, vec![9024, 4512, 563, 1687]);
    Ok(())
}
