//! Text results. All content is escaped before it reaches markup.

use std::path::Path;

use super::{
    escape_html, facts, panel, steps_list, variant_item, variants_container, MediaBlob, Rendered,
};
use crate::api::response::{TextAugmented, TextOriginal, TextPreprocessed};

/// Download name for processed text.
pub const EXPORT_FILENAME: &str = "processed_text.txt";

/// Processed text offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextExport {
    pub filename: String,
    pub contents: String,
}

impl TextExport {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            filename: EXPORT_FILENAME.to_string(),
            contents: contents.into(),
        }
    }

    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.contents.as_bytes()).await
    }
}

fn pre(text: &str) -> String {
    format!("<pre class=\"text-content\">{}</pre>", escape_html(text))
}

pub fn original(result: &TextOriginal) -> Rendered {
    let v = &result.validation;
    let rows: Vec<(&str, String)> = [
        ("Characters", v.length),
        ("Words", v.word_count),
        ("Lines", v.line_count),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.map(|n| (label, n.to_string())))
    .collect();
    let body = format!("{}{}", pre(&result.text), facts(&rows));
    Rendered::new(panel("text", "Original Text", result.source, &body))
}

pub fn preprocessed(result: &TextPreprocessed) -> Rendered {
    let export = TextExport::new(result.text.clone());
    let blob = MediaBlob::new(
        EXPORT_FILENAME,
        "text/plain;charset=utf-8",
        export.contents.clone().into_bytes(),
    );
    let comparison = match &result.original_text {
        Some(original) => format!(
            "<div class=\"text-compare\"><h6>Original Text</h6>{}<h6>Processed Text</h6>{}</div>",
            pre(original),
            pre(&result.text)
        ),
        None => pre(&result.text),
    };
    let body = format!(
        "{comparison}<a class=\"btn btn-secondary\" href=\"{}\" download=\"{EXPORT_FILENAME}\">\
         Download processed text</a>{}",
        blob.placeholder(),
        steps_list(&result.steps)
    );
    let mut rendered =
        Rendered::new(panel("text", "Processed Text", result.source, &body)).with_blobs(vec![blob]);
    rendered.text_export = Some(export);
    rendered
}

pub fn augmented(result: &TextAugmented) -> Rendered {
    let items: Vec<String> = result
        .variants
        .iter()
        .map(|variant| variant_item(&variant.name, &pre(&variant.value)))
        .collect();
    let body = format!("{}{}", variants_container(&items), steps_list(&result.steps));
    Rendered::new(panel("text", "Augmented Texts", result.source, &body))
}
