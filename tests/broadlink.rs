use anyhow::Result;
use ircode::formats::broadlink::BroadlinkCode;
use ircode::formats::{self, AnyCode};
use ircode::raw::{RawCode, RawPacket};

#[test]
fn broadlink_short_pulse_round_trips_within_one_microsecond() -> Result<()> {
    let pulses = vec![9024, 4512, 563, 1687];
    let raw = RawCode {
        packets: vec![RawPacket::new(pulses.clone())?],
        fc: 38000,
        count: 1,
        packet_interval: 0,
    };
    let code = BroadlinkCode::from_code(&raw)?;
    let back = code.to_raw()?;
    for (a, b) in pulses.iter().zip(back.packets[0].pulses.iter()) {
        assert!((a - b).abs() <= 1);
    }

    let any = formats::from_string(&code.to_string_code())?;
    let AnyCode::Broadlink(reparsed) = any else {
        panic!("expected broadlink");
    };
    assert_eq!(reparsed, code);
    Ok(())
}

#[test]
fn broadlink_rejects_unrecognized_header_byte() {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    let bogus = BASE64.encode([0x00, 0x00, 0x00, 0x00]);
    let code = BroadlinkCode::from_string(&format!(":{bogus}")).unwrap();
    assert!(code.to_raw().is_err());
}
