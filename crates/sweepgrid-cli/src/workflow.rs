//! API-format workflow loading.
//!
//! Accepts the shapes ComfyUI exports: a `{"prompt": {...}}` wrapper, a
//! `{"nodes": {...}}` wrapper, or a bare node map. Anything else means the
//! user exported the UI graph instead of the API JSON.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Load the node map the sweep mutates. The returned value maps node id →
/// node object with an `inputs` mapping.
pub fn load_api_prompt(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read workflow API JSON from '{}'", path.display()))?;
    let doc: Value = serde_json::from_str(&text)
        .with_context(|| format!("workflow '{}' is not valid JSON", path.display()))?;

    if let Some(prompt) = doc.get("prompt").filter(|v| v.is_object()) {
        return Ok(prompt.clone());
    }
    if let Some(nodes) = doc.get("nodes").filter(|v| v.is_object()) {
        return Ok(nodes.clone());
    }
    if doc.is_object() {
        return Ok(doc);
    }
    bail!(
        "workflow '{}' must be API-format JSON (export via 'Save (API format)')",
        path.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_json(dir: &Path, name: &str, v: &Value) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(v).unwrap()).unwrap();
        path
    }

    #[test]
    fn unwraps_prompt_and_nodes_wrappers() {
        let dir = tempfile::tempdir().unwrap();
        let node_map = json!({"31": {"inputs": {"steps": 20}}});

        let p = write_json(dir.path(), "a.json", &json!({"prompt": node_map.clone()}));
        assert_eq!(load_api_prompt(&p).unwrap(), node_map);

        let p = write_json(dir.path(), "b.json", &json!({"nodes": node_map.clone()}));
        assert_eq!(load_api_prompt(&p).unwrap(), node_map);
    }

    #[test]
    fn accepts_bare_node_map() {
        let dir = tempfile::tempdir().unwrap();
        let node_map = json!({"31": {"inputs": {"steps": 20}}});
        let p = write_json(dir.path(), "bare.json", &node_map);
        assert_eq!(load_api_prompt(&p).unwrap(), node_map);
    }

    #[test]
    fn rejects_non_object_documents() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_json(dir.path(), "arr.json", &json!([1, 2, 3]));
        let err = load_api_prompt(&p).unwrap_err();
        assert!(err.to_string().contains("API-format"));
    }

    #[test]
    fn missing_file_carries_the_path_in_the_error() {
        let err = load_api_prompt(Path::new("/no/such/workflow.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/workflow.json"));
    }
}
