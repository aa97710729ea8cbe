use anyhow::Result;
use ircode::formats::nec::NecCode;
use ircode::formats::AnyCode;
use ircode::identify::try_decode;
use std::collections::BTreeMap;

#[test]
fn auto_identify_ranks_nec_first_for_a_nec_trace() -> Result<()> {
    let nec = NecCode::new(
        38000,
        1,
        BTreeMap::new(),
        vec![vec![0x20, 0xdf, 0x10, 0xef]],
    )?;
    let raw = nec.to_raw()?;

    let candidates = try_decode(&AnyCode::Raw(raw))?;
    assert!(candidates.len() >= 2);
    assert_eq!(candidates[0].code.names()[0], "nec");
    assert!(candidates[0].score > 0.95);
    assert!(candidates.iter().any(|c| c.code.names()[0] == "raw"));
    Ok(())
}
