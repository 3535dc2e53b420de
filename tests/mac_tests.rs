use lanventory::db::oui::{MacVendorDb, UNKNOWN_VENDOR};
use lanventory::detect::mac::normalize_mac;
use regex::Regex;

#[test]
fn normalize_handles_common_separator_styles() {
    assert_eq!(normalize_mac("aa-bb-cc-dd-ee-ff"), "AA:BB:CC:DD:EE:FF");
    assert_eq!(normalize_mac("aa:bb:cc:dd:ee:ff"), "AA:BB:CC:DD:EE:FF");
    assert_eq!(normalize_mac("aabb.ccdd.eeff"), "AA:BB:CC:DD:EE:FF");
    assert_eq!(normalize_mac("aabbccddeeff"), "AA:BB:CC:DD:EE:FF");
}

#[test]
fn normalize_is_idempotent() {
    for raw in ["aa-bb-cc-dd-ee-ff", "00:0c:29:01:02:03", "B827.EB01.0203"] {
        let once = normalize_mac(raw);
        assert_eq!(normalize_mac(&once), once);
    }
}

#[test]
fn normalized_macs_are_canonical() {
    let canonical = Regex::new(r"^[0-9A-F]{2}(:[0-9A-F]{2}){5}$").unwrap();
    for raw in ["aa-bb-cc-dd-ee-ff", "00:0c:29:01:02:03", "b827.eb01.0203"] {
        let mac = normalize_mac(raw);
        assert!(canonical.is_match(&mac), "{mac} is not canonical");
    }
}

#[test]
fn empty_input_stays_empty() {
    assert_eq!(normalize_mac(""), "");
}

#[test]
fn vendor_lookup_knows_apple_prefixes() {
    let mut db = MacVendorDb::new().unwrap();
    let vendor = db.vendor_of("00:17:F2:01:02:03");
    assert!(vendor.contains("Apple"), "got {vendor:?}");
}

#[test]
fn vendor_lookup_falls_back_to_unknown() {
    let mut db = MacVendorDb::new().unwrap();
    assert_eq!(db.vendor_of("FE:ED:FA:CE:00:01"), UNKNOWN_VENDOR);
}
