//! Standalone workbench page.

use std::fmt::Write as _;

use super::{escape_html, BlobRegistry};
use crate::workflow::{Controls, PanelSlot, Surface};

pub const DEFAULT_THREE_JS_URL: &str =
    "https://cdn.jsdelivr.net/npm/three@0.160.0/build/three.module.js";

/// How blob placeholders are turned into URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobLinks {
    /// Inline `data:` URIs; the page is self-contained.
    Inline,
    /// `{prefix}{uuid}`, served alongside the page.
    Served { prefix: String },
}

#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub blob_links: BlobLinks,
    pub three_js_url: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Media Preprocessing Workbench".to_string(),
            blob_links: BlobLinks::Inline,
            three_js_url: DEFAULT_THREE_JS_URL.to_string(),
        }
    }
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0 auto;max-width:1100px;padding:1rem}\
.alert{padding:.75rem 1rem;border-radius:4px;margin-bottom:1rem}\
.alert-info{background:#cff4fc}.alert-success{background:#d1e7dd}\
.alert-warning{background:#fff3cd}.alert-danger{background:#f8d7da}\
.panels{display:grid;grid-template-columns:1fr 1fr;gap:1rem}\
.result-panel{border:1px solid #ddd;border-radius:4px;padding:1rem}\
.img-fluid{max-width:100%}.text-content{white-space:pre-wrap}\
.badge.sample-data{margin-left:.5rem;font-size:.7em;background:#ffc107;padding:.1rem .4rem;border-radius:3px}\
.mesh-viewer{width:100%;height:320px;background:#f4f4f4}\
.variant{border-top:1px solid #eee;padding-top:.5rem}";

/// Reads each `<script type="application/json" id="mesh-…">` and draws it.
const VIEWER_HOOK: &str = r#"
const viewers = document.querySelectorAll('.mesh-viewer');
for (const el of viewers) {
  const data = JSON.parse(document.getElementById(el.dataset.mesh).textContent);
  const renderer = new THREE.WebGLRenderer({ antialias: true });
  renderer.setSize(el.clientWidth, el.clientHeight);
  el.appendChild(renderer.domElement);
  const scene = new THREE.Scene();
  scene.add(new THREE.AmbientLight(0x404040));
  const light = new THREE.DirectionalLight(0xffffff, 1);
  light.position.set(1, 1, 1);
  scene.add(light);
  const geometry = new THREE.BufferGeometry();
  geometry.setAttribute('position', new THREE.Float32BufferAttribute(data.positions.flat(), 3));
  geometry.setAttribute('normal', new THREE.Float32BufferAttribute(data.normals.flat(), 3));
  geometry.setIndex(data.indices);
  const mesh = new THREE.Mesh(geometry, new THREE.MeshPhongMaterial({ color: 0x808080 }));
  scene.add(mesh);
  const camera = new THREE.PerspectiveCamera(75, el.clientWidth / el.clientHeight, 0.1, 1000);
  camera.position.z = 5;
  const tick = () => {
    requestAnimationFrame(tick);
    mesh.rotation.y += 0.01;
    renderer.render(scene, camera);
  };
  tick();
}
"#;

pub fn render_page(surface: &Surface, options: &PageOptions) -> String {
    let mut body = String::new();

    if let Some(notice) = surface.alert() {
        let _ = write!(
            body,
            "<div class=\"alert alert-{}\" role=\"alert\">{}</div>",
            notice.level.css_class(),
            escape_html(&notice.message)
        );
    }
    if let Some(controls) = surface.controls() {
        body.push_str(&controls_panel(controls));
    }

    body.push_str("<div class=\"panels\">");
    for (slot, id) in [
        (PanelSlot::Original, "original"),
        (PanelSlot::Processed, "processed"),
    ] {
        let _ = write!(body, "<div id=\"{id}\">");
        if let Some(rendered) = surface.panel(slot) {
            body.push_str(&rendered.html);
        }
        body.push_str("</div>");
    }
    body.push_str("</div>");

    let body = resolve_blobs(&body, surface.blobs(), &options.blob_links);
    let has_mesh = body.contains("class=\"mesh-viewer\"");

    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{}</h1>\n{body}\n",
        escape_html(&options.title),
        escape_html(&options.title),
    );
    if has_mesh {
        let _ = write!(
            html,
            "<script type=\"module\">\nimport * as THREE from \"{}\";\n{VIEWER_HOOK}</script>\n",
            escape_html(&options.three_js_url)
        );
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Replace `blob:<uuid>` placeholders for every live blob.
pub fn resolve_blobs(html: &str, blobs: &BlobRegistry, links: &BlobLinks) -> String {
    let mut out = html.to_string();
    for blob in blobs.iter() {
        let placeholder = blob.placeholder();
        if !out.contains(&placeholder) {
            continue;
        }
        let url = match links {
            BlobLinks::Inline => blob.data_uri(),
            BlobLinks::Served { prefix } => format!("{prefix}{}", blob.id),
        };
        out = out.replace(&placeholder, &url);
    }
    out
}

fn checkbox(name: &str, label: &str, checked: bool) -> String {
    format!(
        "<label><input type=\"checkbox\" name=\"{name}\"{} disabled> {label}</label>",
        if checked { " checked" } else { "" }
    )
}

fn range(name: &str, label: &str, min: f64, max: f64, step: f64, value: f64) -> String {
    format!(
        "<label>{label} <input type=\"range\" name=\"{name}\" min=\"{min}\" max=\"{max}\" \
         step=\"{step}\" value=\"{value}\" disabled> <output>{value}</output></label>"
    )
}

/// Read-only rendering of the active controls.
fn controls_panel(controls: &Controls) -> String {
    let (preprocess, augment): (Vec<String>, Vec<String>) = match controls {
        Controls::Image(c) => (
            vec![
                format!(
                    "<label>Resize <input type=\"number\" name=\"resize_width\" value=\"{}\" disabled> \
                     × <input type=\"number\" name=\"resize_height\" value=\"{}\" disabled></label>",
                    c.resize_width.map(|w| w.to_string()).unwrap_or_default(),
                    c.resize_height.map(|h| h.to_string()).unwrap_or_default()
                ),
                checkbox("grayscale", "Convert to Grayscale", c.grayscale),
                checkbox("normalize", "Normalize Colors", c.normalize),
            ],
            vec![
                checkbox("flip", "Flip Horizontally", c.flip),
                checkbox("rotate", "Rotate 90°", c.rotate),
                range("brightness", "Brightness", -1.0, 1.0, 0.05, c.brightness),
            ],
        ),
        Controls::Audio(c) => (
            vec![
                checkbox("normalize", "Normalize Audio", c.normalize),
                checkbox("remove_silence", "Remove Silence", c.remove_silence),
                checkbox("reduce_noise", "Reduce Noise", c.reduce_noise),
            ],
            vec![
                range("speed", "Speed", 0.5, 2.0, 0.1, c.speed),
                range(
                    "pitch_shift",
                    "Pitch Shift (semitones)",
                    -12.0,
                    12.0,
                    1.0,
                    f64::from(c.pitch_shift),
                ),
            ],
        ),
        Controls::Text => (Vec::new(), Vec::new()),
        Controls::Mesh(c) => (
            vec![
                checkbox("remove_duplicates", "Remove Duplicate Vertices", c.remove_duplicates),
                checkbox("fix_normals", "Fix Normals", c.fix_normals),
                checkbox("fill_holes", "Fill Holes", c.fill_holes),
            ],
            Vec::new(),
        ),
    };
    let category = controls.category();
    format!(
        "<section class=\"controls\" data-category=\"{category}\">\
         <h2>{} Controls</h2>\
         <fieldset><legend>Preprocessing Options</legend>{}</fieldset>\
         <fieldset><legend>Augmentation Options</legend>{}</fieldset></section>",
        category.label(),
        preprocess.concat(),
        augment.concat()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaCategory;
    use crate::render::{MediaBlob, Rendered};
    use crate::workflow::Notice;

    fn surface_with_image() -> (Surface, MediaBlob) {
        let mut surface = Surface::new();
        let blob = MediaBlob::new("img", "image/png", vec![1u8, 2, 3]);
        let html = format!("<img src=\"{}\">", blob.placeholder());
        surface.install(
            PanelSlot::Original,
            Rendered::new(html).with_blobs(vec![blob.clone()]),
        );
        surface.set_controls(Some(Controls::defaults(MediaCategory::Image)));
        surface.notify(Notice::success("File uploaded successfully"));
        (surface, blob)
    }

    #[test]
    fn test_inline_page_embeds_data_uris() {
        let (surface, blob) = surface_with_image();
        let html = render_page(&surface, &PageOptions::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(&blob.data_uri()));
        assert!(!html.contains(&blob.placeholder()));
        assert!(html.contains("alert-success"));
        assert!(html.contains("name=\"grayscale\""));
        assert!(!html.contains("three.module.js"));
    }

    #[test]
    fn test_served_page_links_blobs() {
        let (surface, blob) = surface_with_image();
        let options = PageOptions {
            blob_links: BlobLinks::Served {
                prefix: "/blobs/".into(),
            },
            ..PageOptions::default()
        };
        let html = render_page(&surface, &options);
        assert!(html.contains(&format!("src=\"/blobs/{}\"", blob.id)));
    }

    #[test]
    fn test_mesh_panel_pulls_in_viewer() {
        let mut surface = Surface::new();
        surface.install(
            PanelSlot::Processed,
            Rendered::new("<div class=\"mesh-viewer\" data-mesh=\"mesh-1\"></div>".into()),
        );
        let html = render_page(&surface, &PageOptions::default());
        assert!(html.contains("import * as THREE from"));
    }

    #[test]
    fn test_notice_is_escaped() {
        let mut surface = Surface::new();
        surface.notify(Notice::danger("Upload failed: <script>"));
        let html = render_page(&surface, &PageOptions::default());
        assert!(html.contains("Upload failed: &lt;script&gt;"));
    }
}
