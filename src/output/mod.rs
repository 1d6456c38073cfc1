//! Output of a calculation - the variable map and its renderings
//!
//! - `variables` - Derivation of [VersionVariables] from a calculated version
//! - This module - JSON and human-readable rendering

pub mod variables;

pub use variables::{VersionVariables, VARIABLE_NAMES};

use console::style;

/// Pretty-printed JSON object of all variables
pub fn to_json(variables: &VersionVariables) -> serde_json::Result<String> {
    serde_json::to_string_pretty(variables)
}

/// One `Name: value` line per variable, names aligned
pub fn to_text(variables: &VersionVariables) -> String {
    let map = variables.to_map();
    let width = map.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    map.iter()
        .map(|(name, value)| {
            let name = format!("{:width$}", name, width = width);
            format!("{}  {}", style(name).bold(), style(value).green())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print an error to stderr in red
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigurationBuilder, EffectiveConfiguration};
    use crate::domain::SemanticVersion;

    fn variables() -> VersionVariables {
        let config = ConfigurationBuilder::new().build().unwrap();
        let main = config.branch("main").unwrap();
        let effective = EffectiveConfiguration::new(&config, "main", main).unwrap();
        VersionVariables::from_version(&SemanticVersion::new(2, 1, 0), &effective)
    }

    #[test]
    fn test_json_contains_every_variable() {
        let json = to_json(&variables()).unwrap();
        for name in VARIABLE_NAMES {
            assert!(json.contains(&format!("\"{}\"", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_text_has_one_line_per_variable() {
        console::set_colors_enabled(false);
        let text = to_text(&variables());
        assert_eq!(text.lines().count(), VARIABLE_NAMES.len());
        assert!(text.lines().any(|line| line.starts_with("SemVer") && line.ends_with("2.1.0")));
    }
}
