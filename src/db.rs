use crate::constants::BUILTIN_OUI;
use crate::errors::DiscoveryError;
use ::oui::OuiDatabase;
use eui48::MacAddress;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// OUI (Organizationally Unique Identifier) vendor lookup.
pub mod oui {
    use super::*;

    /// Global OUI database, loaded lazily on first lookup.
    static OUI_DB: OnceCell<Arc<OuiDatabase>> = OnceCell::new();

    pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

    /// Vendor lookup over the MAC OUI prefix with a per-engine result cache.
    ///
    /// Data comes from a `manuf.txt` in the working directory when present,
    /// otherwise from the small built-in table.
    pub struct MacVendorDb {
        cache: HashMap<String, String>,
    }

    impl MacVendorDb {
        pub fn new() -> Result<Self, DiscoveryError> {
            Ok(Self {
                cache: HashMap::new(),
            })
        }

        /// Vendor name for a canonical MAC; `"Unknown Vendor"` when the
        /// prefix is not in the database.
        pub fn vendor_of(&mut self, mac: &str) -> String {
            if let Some(vendor) = self.cache.get(mac) {
                return vendor.clone();
            }

            let db = OUI_DB.get_or_init(|| {
                Arc::new(OuiDatabase::new_from_file("manuf.txt").unwrap_or_else(|_| {
                    warn!("manuf.txt not found, using built-in OUI fallback");
                    OuiDatabase::new_from_str(BUILTIN_OUI).expect("built-in OUI table is valid")
                }))
            });

            let vendor = MacAddress::parse_str(mac)
                .ok()
                .and_then(|addr| db.query_by_mac(&addr).ok().flatten())
                .and_then(|entry| entry.name_long.filter(|name| !name.is_empty()))
                .unwrap_or_else(|| UNKNOWN_VENDOR.to_string());

            self.cache.insert(mac.to_string(), vendor.clone());
            vendor
        }
    }
}
