//! Static snapshot page
//!
//! Renders the current scene as a standalone HTML page: the viewer runtime is
//! inlined and every replay blob becomes one `fetch` of a base64 data URL fed
//! to the viewer.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::tree::Blob;

/// Runtime script expected under the static root.
pub const RUNTIME_FILE: &str = "main.min.js";

/// Read the viewer runtime. A missing runtime yields an empty script so the
/// page still carries the scene data.
pub async fn load_runtime(static_root: &Path) -> String {
    let path = static_root.join(RUNTIME_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(src) => src,
        Err(e) => {
            log::warn!("Viewer runtime {} unavailable: {}", path.display(), e);
            String::new()
        }
    }
}

/// One inline command replaying `data` into the viewer.
pub fn command_script(data: &[u8]) -> String {
    format!(
        r#"
fetch("data:application/octet-binary;base64,{}")
    .then(res => res.arrayBuffer())
    .then(buffer => viewer.handle_command_bytearray(new Uint8Array(buffer)));
"#,
        STANDARD.encode(data)
    )
}

/// Build the full page.
pub fn render_static_html(runtime: &str, replay: &[Blob]) -> String {
    let mut commands = String::new();
    for blob in replay {
        commands.push_str(&command_script(blob));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
    <head> <meta charset=utf-8> <title>scenecast</title> </head>
    <body>
        <div id="scenecast-pane">
        </div>
        <script>
{runtime}
        </script>
        <script>
            var viewer = new MeshCat.Viewer(document.getElementById("scenecast-pane"));
{commands}
        </script>
        <style>
            body {{ margin: 0; }}
            #scenecast-pane {{
                width: 100vw;
                height: 100vh;
                overflow: hidden;
            }}
        </style>
        <script id="embedded-json"></script>
    </body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_command_script_base64() {
        let script = command_script(b"hi");
        assert!(script.contains("base64,aGk="));
        assert!(script.contains("handle_command_bytearray"));
    }

    #[test]
    fn test_render_one_fetch_per_blob() {
        let replay: Vec<Blob> = vec![Arc::from(&b"one"[..]), Arc::from(&b"two"[..])];
        let html = render_static_html("/* runtime */", &replay);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("/* runtime */"));
        assert_eq!(html.matches("fetch(").count(), 2);
        assert!(html.contains("body { margin: 0; }"));
    }

    #[tokio::test]
    async fn test_load_runtime_missing_is_empty() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        assert_eq!(load_runtime(temp_dir.path()).await, "");
    }

    #[tokio::test]
    async fn test_load_runtime_reads_file() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(temp_dir.path().join(RUNTIME_FILE), "var MeshCat = {};").unwrap();
        assert_eq!(load_runtime(temp_dir.path()).await, "var MeshCat = {};");
    }
}
