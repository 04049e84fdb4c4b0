use crate::errors::{GitBoardError, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::PrettyFormatter;

pub const CONFIG_START: &str = "<!-- GIT-BOARD-CONFIG-START";
pub const CONFIG_END: &str = "GIT-BOARD-CONFIG-END -->";

const BLOCK_SEPARATOR: &str = "\n\n";

/// One configuration record per text body.
pub trait ConfigStore {
    /// `Ok(None)` when the body carries no configuration.
    fn read<T: DeserializeOwned>(&self, body: &str) -> Result<Option<T>>;
    /// Returns the new body; refuses to touch a body with unpaired markers.
    fn write<T: Serialize>(&self, body: &str, config: &T) -> Result<String>;
}

/// Stores the configuration as a JSON block between HTML comment markers,
/// so it stays invisible in the rendered description.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedConfigStore;

/// Byte range of the block, markers included.
#[derive(Debug, PartialEq, Eq)]
struct BlockSpan {
    start: usize,
    payload_start: usize,
    payload_end: usize,
    end: usize,
}

impl EmbeddedConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Fails when the markers are unpaired or out of order, even where
    /// `read` would see no configuration at all.
    pub fn check(&self, body: &str) -> Result<()> {
        Self::locate(body).map(|_| ())
    }

    fn locate(body: &str) -> Result<Option<BlockSpan>> {
        let start = body.find(CONFIG_START);
        let has_end = body.contains(CONFIG_END);

        let start = match (start, has_end) {
            (None, false) => return Ok(None),
            (Some(start), true) => start,
            (Some(_), false) => {
                return Err(GitBoardError::Corruption(format!(
                    "found {:?} without {:?}",
                    CONFIG_START, CONFIG_END
                )))
            }
            (None, true) => {
                return Err(GitBoardError::Corruption(format!(
                    "found {:?} without {:?}",
                    CONFIG_END, CONFIG_START
                )))
            }
        };

        let payload_start = start + CONFIG_START.len();
        let payload_end = body[payload_start..]
            .find(CONFIG_END)
            .map(|offset| payload_start + offset)
            .ok_or_else(|| {
                GitBoardError::Corruption(format!(
                    "no {:?} after {:?}",
                    CONFIG_END, CONFIG_START
                ))
            })?;

        Ok(Some(BlockSpan {
            start,
            payload_start,
            payload_end,
            end: payload_end + CONFIG_END.len(),
        }))
    }

    fn render_block<T: Serialize>(config: &T) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        config.serialize(&mut serializer)?;
        let json = String::from_utf8_lossy(&buffer);

        Ok(format!("{}\n{}\n{}", CONFIG_START, json, CONFIG_END))
    }
}

impl ConfigStore for EmbeddedConfigStore {
    fn read<T: DeserializeOwned>(&self, body: &str) -> Result<Option<T>> {
        if !body.contains(CONFIG_START) {
            log::debug!("No embedded configuration found");
            return Ok(None);
        }

        let span = match Self::locate(body)? {
            Some(span) => span,
            None => return Ok(None),
        };

        let config = serde_json::from_str(&body[span.payload_start..span.payload_end])?;
        Ok(Some(config))
    }

    fn write<T: Serialize>(&self, body: &str, config: &T) -> Result<String> {
        let block = Self::render_block(config)?;

        let span = Self::locate(body).map_err(|e| {
            log::error!("❌ Refusing to write configuration: {}", e);
            e
        })?;

        let remaining = match span {
            None => body.to_string(),
            Some(span) => {
                // Drop the separator added together with the previous block
                let before = body[..span.start]
                    .strip_suffix(BLOCK_SEPARATOR)
                    .unwrap_or(&body[..span.start]);
                format!("{}{}", before, &body[span.end..])
            }
        };

        Ok(format!("{}{}{}", remaining, BLOCK_SEPARATOR, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{StepResult, WorkflowConfig};
    use crate::naming::BranchType;
    use serde_json::json;

    fn sample_config() -> WorkflowConfig {
        WorkflowConfig {
            results: vec![StepResult::done(
                "link-branch",
                "The branch **develop** was used".to_string(),
            )],
            hotfix_branch: Some("hotfix/1.2.4".to_string()),
            branch_type: Some(BranchType::Hotfix),
            ..Default::default()
        }
    }

    #[test]
    fn test_read_without_block_is_absent() {
        let store = EmbeddedConfigStore::new();
        let config: Option<WorkflowConfig> = store.read("Plain description").unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_write_appends_block_after_blank_line() {
        let store = EmbeddedConfigStore::new();
        let body = store.write("Description", &sample_config()).unwrap();

        assert!(body.starts_with("Description\n\n<!-- GIT-BOARD-CONFIG-START\n{\n    \""));
        assert!(body.ends_with("\n}\nGIT-BOARD-CONFIG-END -->"));
    }

    #[test]
    fn test_round_trip() {
        let store = EmbeddedConfigStore::new();
        for body in ["", "Some text", "Text\n\nwith\nlines\n"] {
            let written = store.write(body, &sample_config()).unwrap();
            let read: Option<WorkflowConfig> = store.read(&written).unwrap();
            assert_eq!(read, Some(sample_config()));
        }
    }

    #[test]
    fn test_round_trip_keeps_unknown_fields() {
        let store = EmbeddedConfigStore::new();
        let body = format!(
            "Intro\n\n{}\n{}\n{}",
            CONFIG_START,
            json!({"results": [], "projects": ["board-1"], "release": {"version": "2.0"}}),
            CONFIG_END
        );

        let config: WorkflowConfig = store.read(&body).unwrap().unwrap();
        assert_eq!(config.extra["projects"], json!(["board-1"]));

        let rewritten = store.write(&body, &config).unwrap();
        let value: serde_json::Value = store.read(&rewritten).unwrap().unwrap();
        assert_eq!(value["release"]["version"], json!("2.0"));
    }

    #[test]
    fn test_second_write_replaces_block() {
        let store = EmbeddedConfigStore::new();
        let first = store.write("Description", &sample_config()).unwrap();

        let mut updated = sample_config();
        updated.hotfix_branch = None;
        let second = store.write(&first, &updated).unwrap();

        assert_eq!(second.matches(CONFIG_START).count(), 1);
        assert_eq!(second.matches(CONFIG_END).count(), 1);
        assert_eq!(second, store.write("Description", &updated).unwrap());

        let read: WorkflowConfig = store.read(&second).unwrap().unwrap();
        assert_eq!(read.hotfix_branch, None);
    }

    #[test]
    fn test_write_preserves_text_around_existing_block() {
        let store = EmbeddedConfigStore::new();
        let body = format!("Before\n{}\n{{}}\n{}\nAfter", CONFIG_START, CONFIG_END);

        let written = store.write(&body, &json!({"a": 1})).unwrap();

        assert!(written.starts_with("Before\n\nAfter\n\n"));
        assert_eq!(store.read::<serde_json::Value>(&written).unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_unpaired_start_marker_is_corruption() {
        let store = EmbeddedConfigStore::new();
        let body = format!("Text\n{}\n{{\"results\": []}}", CONFIG_START);

        assert!(matches!(
            store.write(&body, &sample_config()),
            Err(GitBoardError::Corruption(_))
        ));
        assert!(matches!(
            store.read::<WorkflowConfig>(&body),
            Err(GitBoardError::Corruption(_))
        ));
    }

    #[test]
    fn test_unpaired_end_marker_refuses_write() {
        let store = EmbeddedConfigStore::new();
        let body = format!("Text\n{}", CONFIG_END);

        assert!(matches!(
            store.write(&body, &sample_config()),
            Err(GitBoardError::Corruption(_))
        ));
        // Without a start marker there is nothing to read
        assert!(store.read::<WorkflowConfig>(&body).unwrap().is_none());
        assert!(matches!(store.check(&body), Err(GitBoardError::Corruption(_))));
    }

    #[test]
    fn test_check_accepts_paired_or_missing_markers() {
        let store = EmbeddedConfigStore::new();
        let written = store.write("Description", &sample_config()).unwrap();

        assert!(store.check("Plain description").is_ok());
        assert!(store.check(&written).is_ok());
        assert!(matches!(
            store.check(&format!("{}\n{{}}", CONFIG_START)),
            Err(GitBoardError::Corruption(_))
        ));
    }

    #[test]
    fn test_end_marker_before_start_marker_is_corruption() {
        let store = EmbeddedConfigStore::new();
        let body = format!("{}\n{{}}\n{}", CONFIG_END, CONFIG_START);

        assert!(matches!(
            store.write(&body, &sample_config()),
            Err(GitBoardError::Corruption(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let store = EmbeddedConfigStore::new();
        let body = format!("{}\n{{ not json\n{}", CONFIG_START, CONFIG_END);

        assert!(matches!(
            store.read::<WorkflowConfig>(&body),
            Err(GitBoardError::Json(_))
        ));
    }
}
