// Writes the map view as a standalone Leaflet page.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;
use serde::Serialize;
use snafu::prelude::*;

use crate::pipeline::map_model::MapView;
use crate::pipeline::*;

#[derive(Serialize, Debug)]
struct JsMarker {
    #[serde(rename = "lat")]
    lat: f64,
    #[serde(rename = "lon")]
    lon: f64,
    #[serde(rename = "label")]
    label: String,
}

#[derive(Serialize, Debug)]
struct JsLine {
    #[serde(rename = "from")]
    from: [f64; 2],
    #[serde(rename = "to")]
    to: [f64; 2],
    #[serde(rename = "tooltip")]
    tooltip: String,
}

#[derive(Serialize, Debug)]
struct JsMap {
    #[serde(rename = "center")]
    center: [f64; 2],
    #[serde(rename = "zoom")]
    zoom: u8,
    #[serde(rename = "layerName")]
    layer_name: String,
    #[serde(rename = "markers")]
    markers: Vec<JsMarker>,
    #[serde(rename = "lines")]
    lines: Vec<JsLine>,
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8" />
<title>__TITLE__</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
html, body, #map { height: 100%; margin: 0; }
.pct-marker {
  width: 20px; height: 20px; line-height: 20px;
  border: 2px solid red; border-radius: 50%;
  background: white; box-sizing: border-box;
  font-size: 8px; font-weight: bold; text-align: center;
}
</style>
</head>
<body>
<div id="map"></div>
<script>
var data = __DATA__;
var map = L.map('map').setView(data.center, data.zoom);
var tiles = L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  maxZoom: 19,
  attribution: '&copy; OpenStreetMap contributors'
}).addTo(map);
var group = L.featureGroup();
data.markers.forEach(function (m) {
  var icon = L.divIcon({className: '', html: '<div class="pct-marker"></div>', iconSize: [20, 20]});
  var marker = L.marker([m.lat, m.lon], {icon: icon});
  marker.on('add', function () {
    marker.getElement().firstChild.textContent = m.label;
  });
  marker.addTo(group);
});
data.lines.forEach(function (l) {
  L.polyline([l.from, l.to], {color: 'gray', weight: 2, opacity: 0.8})
    .bindTooltip(l.tooltip)
    .addTo(group);
});
group.addTo(map);
var overlays = {};
overlays[data.layerName] = group;
L.control.layers({'OpenStreetMap': tiles}, overlays).addTo(map);
</script>
</body>
</html>
"#;

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn to_js(view: &MapView) -> JsMap {
    JsMap {
        center: [view.center.latitude, view.center.longitude],
        zoom: view.zoom,
        // The layer control inserts the name as HTML.
        layer_name: escape_html(&view.layer_name),
        markers: view
            .markers
            .iter()
            .map(|m| JsMarker {
                lat: m.position.latitude,
                lon: m.position.longitude,
                label: m.label.clone(),
            })
            .collect(),
        lines: view
            .connectors
            .iter()
            .map(|c| JsLine {
                from: [c.from.latitude, c.from.longitude],
                to: [c.to.latitude, c.to.longitude],
                tooltip: c
                    .tooltip
                    .iter()
                    .map(|l| escape_html(l))
                    .collect::<Vec<String>>()
                    .join("<br>"),
            })
            .collect(),
    }
}

// Fills the placeholders in the order they appear. Inserted values are never
// scanned again.
fn fill_template(template: &str, values: &[(&str, &str)]) -> PipelineResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    for (placeholder, value) in values.iter() {
        let (head, tail) = match rest.split_once(placeholder) {
            Some(parts) => parts,
            None => whatever!("map template is missing {}", placeholder),
        };
        out.push_str(head);
        out.push_str(value);
        rest = tail;
    }
    out.push_str(rest);
    Ok(out)
}

pub fn render_map_html(view: &MapView) -> PipelineResult<String> {
    let data = serde_json::to_string(&to_js(view)).context(SerializingJsonSnafu {})?;
    // The data sits inside a script element. These only occur inside JSON strings.
    let data = data
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026");
    let title = escape_html(&view.layer_name);
    fill_template(TEMPLATE, &[("__TITLE__", &title), ("__DATA__", &data)])
}

pub fn write_map_html(path: &Path, view: &MapView) -> PipelineResult<()> {
    let html = render_map_html(view)?;
    debug!("write_map_html: path: {:?} bytes: {}", path, html.len());
    let file = File::create(path).context(WritingHtmlSnafu { path })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(html.as_bytes())
        .context(WritingHtmlSnafu { path })?;
    writer.flush().context(WritingHtmlSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::map_model::{Connector, Marker};
    use proximity_divergence::Coordinates;

    fn view() -> MapView {
        let a = Coordinates::new(40.0, 44.0);
        let b = Coordinates::new(40.005, 44.0);
        MapView {
            center: Coordinates::new(40.0025, 44.0),
            zoom: 10,
            layer_name: "Address Pairs".to_string(),
            markers: vec![
                Marker {
                    position: a,
                    label: "50.0%".to_string(),
                    matched: true,
                },
                Marker {
                    position: b,
                    label: "N/A".to_string(),
                    matched: false,
                },
            ],
            connectors: vec![Connector {
                from: a,
                to: b,
                tooltip: vec![
                    "Distance: 0.6 km".to_string(),
                    "Percentage Difference: 30.0%".to_string(),
                ],
            }],
        }
    }

    #[test]
    fn page_embeds_the_view() {
        let html = render_map_html(&view()).unwrap();
        assert!(html.contains("leaflet.js"));
        assert!(html.contains(r#""center":[40.0025,44.0]"#), "{}", html);
        assert!(html.contains(r#""zoom":10"#));
        assert!(html.contains(r#""layerName":"Address Pairs""#));
        assert!(html.contains(r#""label":"50.0%""#));
        assert!(html.contains(r#""label":"N/A""#));
        assert!(html.contains(r"Distance: 0.6 km\u003cbr\u003ePercentage Difference: 30.0%"));
        assert!(html.contains("color: 'gray', weight: 2, opacity: 0.8"));
        assert!(!html.contains("__DATA__"));
    }

    #[test]
    fn names_cannot_close_the_script() {
        let mut v = view();
        v.layer_name = "</script><b>".to_string();
        let html = render_map_html(&v).unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(html.contains("<title>&lt;/script&gt;&lt;b&gt;</title>"));
    }

    #[test]
    fn layer_names_are_inserted_as_text() {
        let mut v = view();
        v.layer_name = "__DATA__ <img src=x onerror=alert(1)>".to_string();
        let html = render_map_html(&v).unwrap();
        assert!(html.contains("<title>__DATA__ &lt;img src=x onerror=alert(1)&gt;</title>"));
        assert_eq!(html.matches(r#""center":"#).count(), 1);
        assert!(!html.contains("<img src"));
        assert!(html.contains(r#""layerName":"__DATA__ \u0026lt;img src=x"#), "{}", html);
    }

    #[test]
    fn placeholders_must_be_present() {
        assert_eq!(
            fill_template("a __X__ b", &[("__X__", "__Y__"), ("__Y__", "!")]).ok(),
            None
        );
        assert_eq!(
            fill_template("a __X__ b __Y__", &[("__X__", "__Y__"), ("__Y__", "!")]).unwrap(),
            "a __Y__ b !"
        );
    }

    #[test]
    fn page_is_written_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.html");
        write_map_html(&path, &view()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<!DOCTYPE html>"));
        assert!(content.contains("markers"));
    }
}
