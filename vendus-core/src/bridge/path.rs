use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{string_arg, BridgeError, BridgeResult, Task, PARSE_PATH};

/// Components of a path, named as the workflow consumes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPath {
    pub root: String,
    pub dir: String,
    pub base: String,
    pub ext: String,
    pub name: String,
}

pub fn parse_path(input: &str) -> ParsedPath {
    let path = Path::new(input);
    let root = if path.has_root() {
        std::path::MAIN_SEPARATOR.to_string()
    } else {
        String::new()
    };
    let base = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => String::new(),
        Some(parent) => parent.to_string_lossy().into_owned(),
        None => root.clone(),
    };
    let ext = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    ParsedPath {
        root,
        dir,
        base,
        ext,
        name,
    }
}

pub struct ParsePathTask;

#[async_trait]
impl Task for ParsePathTask {
    fn name(&self) -> &'static str {
        PARSE_PATH
    }

    async fn call(&self, args: Vec<Value>) -> BridgeResult<Value> {
        let input = string_arg(PARSE_PATH, &args, 0)?;
        serde_json::to_value(parse_path(&input)).map_err(|source| BridgeError::Decode {
            task: PARSE_PATH,
            source,
        })
    }
}
