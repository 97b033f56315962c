use crate::config::Config;
use crate::error::ConfigError;

/// Merge an overlay TOML fragment on top of a base [`Config`].
///
/// Keys present in the overlay win; tables are merged key by key, so a
/// project file can override one server's `args` without restating its
/// `command`.
pub fn merge_configs(base: &Config, overlay_toml: &str) -> Result<Config, ConfigError> {
    let base_str = toml::to_string(base).map_err(ConfigError::parse)?;
    let mut merged: toml::Value = toml::from_str(&base_str).map_err(ConfigError::parse)?;
    let overlay: toml::Value = toml::from_str(overlay_toml).map_err(ConfigError::parse)?;

    merge_values(&mut merged, overlay);

    merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::parse(e))
}

/// Recursively merge `overlay` into `base`.
///
/// Tables merge key by key; every other value type is replaced.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
