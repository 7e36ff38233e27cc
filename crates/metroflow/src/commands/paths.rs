use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::editor::{Editor, MAX_CORNER_RADIUS, MIN_CORNER_RADIUS};
use crate::model::document::DiagramDocument;

/// Route every link of a diagram file and print the resulting SVG path data,
/// one link per line: `id<TAB>source->target<TAB>length<TAB>path`.
pub fn run(file: PathBuf, radius: Option<f32>) -> Result<()> {
    if let Some(r) = radius {
        if !(MIN_CORNER_RADIUS..=MAX_CORNER_RADIUS).contains(&r) {
            anyhow::bail!("--radius must be between {MIN_CORNER_RADIUS} and {MAX_CORNER_RADIUS}");
        }
    }

    let config = Config::load_or_default();
    let (snapshot, globals) = DiagramDocument::open(&file, &config.import_defaults())?;

    let mut editor = Editor::with_snapshot(config.session_config(), snapshot);
    let radius = radius
        .or(globals.corner_radius)
        .unwrap_or(config.corner_radius());
    editor.set_corner_radius(radius);
    let stats = editor.recompute_paths();

    for line in report(&editor) {
        println!("{line}");
    }

    eprintln!(
        "{} {} routed, {} unresolved (corner radius {radius})",
        "Paths:".bold(),
        stats.routed,
        stats.stale
    );
    if stats.stale > 0 {
        eprintln!(
            "  {}",
            "Unresolved links reference shapes missing from the file.".yellow()
        );
    }
    Ok(())
}

fn report(editor: &Editor) -> Vec<String> {
    editor
        .links()
        .iter()
        .map(|link| {
            let (length, data) = match &link.path {
                Some(path) => (format!("{:.1}", path.length()), path.to_svg()),
                None => ("-".to_string(), "-".to_string()),
            };
            format!(
                "{}\t{}->{}\t{length}\t{data}",
                link.id, link.source_id, link.target_id
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::ImportDefaults;

    fn editor_for(json: &str) -> Editor {
        let doc = DiagramDocument::from_json(json).unwrap();
        let snapshot = doc.into_snapshot(&ImportDefaults::default());
        let mut editor = Editor::with_snapshot(Default::default(), snapshot);
        editor.recompute_paths();
        editor
    }

    #[test]
    fn test_report_lists_routed_links() {
        let editor = editor_for(
            r#"{
                "nodes": [
                    {"id": "a", "type": "rect", "x": 0, "y": 0, "width": 100, "height": 60},
                    {"id": "b", "type": "rect", "x": 400, "y": 0, "width": 100, "height": 60}
                ],
                "links": [{"id": "l1", "sourceId": "a", "targetId": "b"}]
            }"#,
        );
        let lines = report(&editor);
        assert_eq!(lines.len(), 1);
        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields[0], "l1");
        assert_eq!(fields[1], "a->b");
        assert_eq!(fields[2], "300.0");
        assert!(fields[3].starts_with("M 50 0"));
    }

    #[test]
    fn test_report_marks_unresolved_links() {
        let editor = editor_for(
            r#"{
                "nodes": [{"id": "a", "type": "rect", "x": 0, "y": 0, "width": 100, "height": 60}],
                "links": [{"id": "l1", "sourceId": "a", "targetId": "gone"}]
            }"#,
        );
        let lines = report(&editor);
        assert_eq!(lines, vec!["l1\ta->gone\t-\t-".to_string()]);
    }
}
