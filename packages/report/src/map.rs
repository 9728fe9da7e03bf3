//! Location maps: `GeoJSON`, a static SVG scatter map and an interactive
//! Leaflet page.

use std::fmt::Write as _;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use outlet_map_analytics_models::MapPoint;
use outlet_map_config::MapConfig;
use outlet_map_location_models::OperatorLabel;
use serde_json::{Value, json};

use crate::{ReportError, escape};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const PADDING: f64 = 30.0;

/// `GeoJSON` `FeatureCollection` with one point feature per location.
#[must_use]
pub fn feature_collection(points: &[MapPoint], map: &MapConfig) -> Value {
    let features: Vec<Value> = points
        .iter()
        .map(|p| {
            let operator = p.operator.to_string();
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": [p.coordinates.longitude, p.coordinates.latitude],
                },
                "properties": {
                    "name": p.name,
                    "address": p.address,
                    "city": p.city,
                    "operator": operator,
                    "color": map.color_for(&operator),
                    "rating": p.rating,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Writes [`feature_collection`] to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_geojson(points: &[MapPoint], map: &MapConfig, path: &Path) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &feature_collection(points, map))?;
    writer.flush().map_err(io_err)?;

    log::info!("Exported {} location features", points.len());
    Ok(())
}

/// Equirectangular scatter map, one circle per location colored by
/// operator, own-brand points drawn last and larger.
#[must_use]
pub fn svg_map(points: &[MapPoint], map: &MapConfig) -> String {
    let mut body = String::new();

    if let Some(project) = Projection::fit(points) {
        let mut ordered: Vec<&MapPoint> = points.iter().collect();
        ordered.sort_by_key(|p| p.operator.is_own_brand());

        for p in ordered {
            let (x, y) = project.apply(p.coordinates.latitude, p.coordinates.longitude);
            let operator = p.operator.to_string();
            let radius = if p.operator.is_own_brand() { 6.0 } else { 4.0 };
            let _ = write!(
                body,
                r##"<circle cx="{x:.1}" cy="{y:.1}" r="{radius}" fill="{}" fill-opacity="0.8" stroke="white" stroke-width="1"><title>{} ({})</title></circle>"##,
                escape(map.color_for(&operator)),
                escape(&p.name),
                escape(&operator),
            );
        }
    }

    let _ = write!(body, "{}", legend(points, map));

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" style="background:#f8fafc">
<text x="{PADDING}" y="20" font-size="14" font-weight="bold">Locations ({})</text>
{body}
</svg>
"##,
        points.len(),
    )
}

fn legend(points: &[MapPoint], map: &MapConfig) -> String {
    let mut out = String::new();
    let present = OperatorLabel::all()
        .iter()
        .filter(|label| points.iter().any(|p| p.operator == **label));

    for (i, label) in present.enumerate() {
        let label = label.to_string();
        #[allow(clippy::cast_precision_loss)]
        let y = (i as f64).mul_add(18.0, 40.0);
        let _ = write!(
            out,
            r##"<circle cx="{:.1}" cy="{y:.1}" r="5" fill="{}"/><text x="{:.1}" y="{:.1}" font-size="12">{}</text>"##,
            WIDTH - 110.0,
            escape(map.color_for(&label)),
            WIDTH - 98.0,
            y + 4.0,
            escape(&label),
        );
    }
    out
}

/// Linear mapping from the points' bounding box to the canvas, keeping
/// degrees of latitude and longitude at a common scale.
struct Projection {
    min_lat: f64,
    min_lng: f64,
    scale: f64,
}

impl Projection {
    fn fit(points: &[MapPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_lat, mut max_lat) = (first.coordinates.latitude, first.coordinates.latitude);
        let (mut min_lng, mut max_lng) =
            (first.coordinates.longitude, first.coordinates.longitude);
        for p in points {
            min_lat = min_lat.min(p.coordinates.latitude);
            max_lat = max_lat.max(p.coordinates.latitude);
            min_lng = min_lng.min(p.coordinates.longitude);
            max_lng = max_lng.max(p.coordinates.longitude);
        }

        let span = (max_lat - min_lat).max(max_lng - min_lng);
        let scale = if span > 0.0 {
            2.0f64.mul_add(-PADDING, HEIGHT.min(WIDTH)) / span
        } else {
            1.0
        };
        Some(Self {
            min_lat,
            min_lng,
            scale,
        })
    }

    fn apply(&self, lat: f64, lng: f64) -> (f64, f64) {
        (
            (lng - self.min_lng).mul_add(self.scale, PADDING),
            HEIGHT - (lat - self.min_lat).mul_add(self.scale, PADDING),
        )
    }
}

/// Standalone Leaflet page with the locations as a `GeoJSON` layer.
///
/// # Errors
///
/// Returns an error if the feature collection cannot be serialized.
pub fn leaflet_page(points: &[MapPoint], map: &MapConfig) -> Result<String, ReportError> {
    // `</` would end the script element early.
    let data = serde_json::to_string(&feature_collection(points, map))?.replace("</", "<\\/");
    let [lat, lng] = map.center;

    Ok(format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Location map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const data = {data};
const map = L.map("map").setView([{lat}, {lng}], {zoom});
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
const layer = L.geoJSON(data, {{
  pointToLayer: (feature, latlng) => L.circleMarker(latlng, {{
    radius: 6,
    color: feature.properties.color,
    fillOpacity: 0.8
  }}),
  onEachFeature: (feature, marker) => {{
    const p = feature.properties;
    const popup = document.createElement("div");
    popup.innerText = `${{p.name}}\n${{p.address}}\n${{p.operator}}`;
    marker.bindPopup(popup);
  }}
}}).addTo(map);
if (data.features.length > 0) {{
  map.fitBounds(layer.getBounds(), {{ padding: [20, 20] }});
}}
</script>
</body>
</html>
"##,
        zoom = map.zoom,
    ))
}
