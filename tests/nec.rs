use anyhow::Result;
use ircode::formats::nec::{ChecksumType, NecCode};
use ircode::formats::{self, AnyCode};
use std::collections::BTreeMap;

#[test]
fn classic_nec_round_trips_through_text_and_raw() -> Result<()> {
    let code = NecCode::new(38000, 1, BTreeMap::new(), vec![vec![0x00, 0xff, 0x12, 0xed]])?;
    let raw = code.to_raw()?;
    let pulses = &raw.packets[0].pulses;
    assert_eq!(&pulses[0..4], &[9024, 4512, 563, 563]);

    let decoded = NecCode::from_code(&raw)?;
    assert_eq!(decoded.address_bytes(), 2);
    assert_eq!(decoded.complement_mode(), 3);
    assert_eq!(decoded.packets, vec![vec![0x00, 0x12]]);

    let any = formats::from_string(&code.to_string_code())?;
    let AnyCode::Nec(reparsed) = any else {
        panic!("expected nec");
    };
    assert_eq!(reparsed.packets, code.packets);
    Ok(())
}

#[test]
fn nec_with_checksum_recovers_type_and_payload() -> Result<()> {
    // checksum_type=1 makes the encoder append its own sum checksum
    // (0x01+0x02+0x03 = 0x06); decode must recover the bare 3-byte payload,
    // not the 4 bytes including that appended checksum.
    let mut overrides = BTreeMap::new();
    overrides.insert("complement_mode".to_string(), 0);
    overrides.insert("address_bytes".to_string(), -1);
    overrides.insert("checksum_type".to_string(), 1);
    let code = NecCode::new(38000, 1, overrides, vec![vec![0x01, 0x02, 0x03]])?;

    let raw = code.to_raw()?;
    let decoded = NecCode::from_code(&raw)?;
    assert_eq!(decoded.checksum_type(), 1);
    assert_eq!(decoded.checksum_type_enum(), ChecksumType::Sum);
    assert_eq!(decoded.packets, vec![vec![0x01, 0x02, 0x03]]);
    Ok(())
}

#[test]
fn nec_struct_round_trips() -> Result<()> {
    let code = NecCode::new(38000, 1, BTreeMap::new(), vec![vec![0x20, 0xdf]])?;
    let value = code.to_struct();
    let AnyCode::Nec(reparsed) = formats::from_struct(&value)? else {
        panic!("expected nec");
    };
    assert_eq!(reparsed, code);
    Ok(())
}

#[test]
fn nec_generic_entry_point_rejects_unknown_format() {
    assert!(formats::from_string("nonsense:00,ff").is_err());
}
