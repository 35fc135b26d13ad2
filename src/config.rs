//! Support for library configuration options

use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Part of the ProdID string that describes the organization (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static ORG_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("My organization".to_string())));

/// Part of the ProdID string that describes the product name (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static PRODUCT_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("CalDavCourier".to_string())));


/// Tunables of the scheduling pipeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingSettings {
    /// The request header a client can use to opt out of server-side scheduling
    pub opt_out_header: String,
    /// The value of `opt_out_header` that disables scheduling
    pub opt_out_value: String,
    /// How many fresh names are tried before giving up on writing into an inbox
    pub max_name_attempts: u32,
    /// Appended to every object name created in an inbox
    pub object_extension: String,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            opt_out_header: "Schedule-Reply".to_string(),
            opt_out_value: "F".to_string(),
            max_name_attempts: 8,
            object_extension: ".ics".to_string(),
        }
    }
}

impl SchedulingSettings {
    /// Read settings from a JSON file. Missing fields get their default value
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let settings = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };
        Ok(settings)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_settings() {
        let settings: SchedulingSettings = serde_json::from_str(r#"{ "max_name_attempts": 2 }"#).unwrap();
        assert_eq!(settings.max_name_attempts, 2);
        assert_eq!(settings.opt_out_header, "Schedule-Reply");
        assert_eq!(settings.opt_out_value, "F");
    }

    #[test]
    fn test_prod_id() {
        let prod_id = crate::ical::default_prod_id();
        assert!(prod_id.starts_with("-//"));
        assert!(prod_id.ends_with("//EN"));
    }
}
