use std::sync::Arc;

use dioxus::html::geometry::WheelDelta;
use dioxus::html::input_data::MouseButton;
use dioxus::prelude::*;
use estatemap_shared::geo::{self, Coordinate};
use estatemap_shared::models::{Marker, Overlay, OverlayKind};

use crate::coords::{self, Pan, Viewport};

const MAP_CONTAINER_ID: &str = "estate-map-container";

const TILE_URL: &str = "https://tile.openstreetmap.org";

/// Pointer travel in pixels before a press becomes a pan.
const MOUSE_PAN_RADIUS: f64 = 3.0;
const TOUCH_PAN_RADIUS: f64 = 8.0;

/// Click distance (container pixels) within which a marker counts as hit.
const HIT_RADIUS: f64 = 18.0;

/// Container size assumed before the element is laid out.
const FALLBACK_SIZE: (f64, f64) = (960.0, 640.0);

const LINE_COLOR: &str = "#7b3fb5";
const AREA_FILL: &str = "rgba(47,127,209,0.15)";
const AREA_STROKE: &str = "#2f7fd1";

fn container_rect() -> Option<web_sys::DomRect> {
    let document = web_sys::window()?.document()?;
    let element = document.get_element_by_id(MAP_CONTAINER_ID)?;
    Some(element.get_bounding_client_rect())
}

fn container_size() -> (f64, f64) {
    container_rect()
        .map(|r| (r.width(), r.height()))
        .filter(|(w, h)| *w > 0.0 && *h > 0.0)
        .unwrap_or(FALLBACK_SIZE)
}

/// Container-relative position of a client point.
fn to_container(client_x: f64, client_y: f64) -> Option<(f64, f64)> {
    let rect = container_rect()?;
    Some(coords::client_to_container(
        client_x,
        client_y,
        rect.left(),
        rect.top(),
    ))
}

/// Zoom step for a wheel event: +1 in, -1 out, 0 for no vertical motion.
fn wheel_step(delta: WheelDelta) -> i32 {
    let dy = match delta {
        WheelDelta::Pixels(d) => d.y,
        WheelDelta::Lines(d) => d.y,
        WheelDelta::Pages(d) => d.y,
    };
    if dy < 0.0 {
        1
    } else if dy > 0.0 {
        -1
    } else {
        0
    }
}

/// Index of the marker drawn closest to `click`, within `threshold` pixels.
///
/// Later markers are drawn on top, so on a tie the later one wins.
pub fn marker_at(
    markers: &[Marker],
    view: &Viewport,
    click: (f64, f64),
    threshold: f64,
) -> Option<usize> {
    let mut hit = None;
    let mut limit = threshold;
    for (i, marker) in markers.iter().enumerate() {
        let (x, y) = view.to_screen(marker.coordinate);
        let d = (x - click.0).hypot(y - click.1);
        if d <= limit {
            limit = d;
            hit = Some(i);
        }
    }
    hit
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn points_attr(path: &[Coordinate], view: &Viewport) -> String {
    path.iter()
        .map(|c| {
            let (x, y) = view.to_screen(*c);
            format!("{x:.1},{y:.1}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the full SVG content as a string, in container pixel space.
fn build_svg_content(
    markers: &[Marker],
    overlays: &[Overlay],
    view: &Viewport,
    selected: Option<Coordinate>,
) -> String {
    let mut svg = String::new();
    build_overlays(&mut svg, overlays, view);
    if let Some(coord) = selected {
        let (x, y) = view.to_screen(coord);
        build_selection_ring(&mut svg, x, y);
    }
    build_markers(&mut svg, markers, view);
    svg
}

fn build_overlays(svg: &mut String, overlays: &[Overlay], view: &Viewport) {
    for overlay in overlays {
        let title = overlay
            .name
            .as_deref()
            .map(|n| format!("<title>{}</title>", escape_xml(n)))
            .unwrap_or_default();
        for path in overlay.paths.iter().filter(|p| p.len() >= 2) {
            let points = points_attr(path, view);
            match overlay.kind {
                OverlayKind::Line => svg.push_str(&format!(
                    r##"<polyline points="{points}" fill="none" stroke="{LINE_COLOR}" stroke-width="4" stroke-linecap="round" stroke-linejoin="round" stroke-opacity="0.8">{title}</polyline>"##
                )),
                OverlayKind::Area => svg.push_str(&format!(
                    r##"<polygon points="{points}" fill="{AREA_FILL}" stroke="{AREA_STROKE}" stroke-width="2">{title}</polygon>"##
                )),
            }
        }
    }
}

fn build_markers(svg: &mut String, markers: &[Marker], view: &Viewport) {
    for marker in markers {
        let (x, y) = view.to_screen(marker.coordinate);
        let color = marker.icon.color();
        let glyph = marker.icon.glyph();
        let title = match &marker.detail {
            Some(detail) => format!("{} ({})", marker.label, detail),
            None => marker.label.clone(),
        };
        let title = escape_xml(&title);
        // Pin tip sits on the coordinate
        let head_y = y - 22.0;
        svg.push_str(&format!(r##"<g role="img"><title>{title}</title>"##));
        svg.push_str(&format!(
            r##"<path d="M{x} {y} L{} {} A12 12 0 1 1 {} {} Z" fill="{color}" stroke="white" stroke-width="2"/>"##,
            x - 8.0,
            head_y + 8.0,
            x + 8.0,
            head_y + 8.0
        ));
        svg.push_str(&format!(
            r##"<text x="{x}" y="{head_y}" fill="white" font-size="12" font-family="sans-serif" font-weight="700" text-anchor="middle" dominant-baseline="central">{glyph}</text>"##
        ));
        svg.push_str("</g>");
    }
}

/// Pulsing ring under the selected project.
fn build_selection_ring(svg: &mut String, cx: f64, cy: f64) {
    svg.push_str(&format!(
        r##"<circle cx="{cx}" cy="{cy}" r="28" fill="none" stroke="#d64545" stroke-width="3" stroke-dasharray="6 4" opacity="0.9"><animate attributeName="opacity" values="0.5;1;0.5" dur="1.2s" repeatCount="indefinite"/></circle>"##
    ));
}

#[component]
pub fn MapView(
    markers: Vec<Marker>,
    overlays: Arc<[Overlay]>,
    selected: Option<Coordinate>,
    center: Signal<Coordinate>,
    zoom: Signal<u8>,
    on_select: EventHandler<String>,
    on_clear: EventHandler<()>,
) -> Element {
    // Amenity marker whose popup is open
    let mut popup = use_signal(|| None::<Marker>);

    let mut mouse_pan = use_signal(|| None::<Pan>);
    let mut touch_pan = use_signal(|| None::<Pan>);

    let (width, height) = container_size();
    let view = Viewport {
        center: *center.read(),
        zoom: *zoom.read(),
        width,
        height,
    };

    let tiles = geo::visible_tiles(view.center, view.zoom, width, height);
    let svg_content = build_svg_content(&markers, &overlays, &view, selected);
    let svg_html = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {width} {height}" style="position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;z-index:5;">{svg_content}</svg>"#
    );

    let popup_marker = popup.read().clone();
    let popup_pos = popup_marker.as_ref().map(|m| view.to_screen(m.coordinate));

    let container_class = if mouse_pan.read().is_some_and(|p| p.is_pan()) {
        "map-container dragging"
    } else {
        "map-container"
    };

    // Resolve a click at container position `at`: project markers select,
    // amenity markers open a popup, empty map clears the selection.
    let hit_markers = markers.clone();
    let mut handle_click = move |at: (f64, f64)| {
        let view = Viewport {
            center: *center.peek(),
            zoom: *zoom.peek(),
            width,
            height,
        };
        match marker_at(&hit_markers, &view, at, HIT_RADIUS).map(|i| &hit_markers[i]) {
            Some(Marker {
                project_id: Some(id),
                ..
            }) => {
                popup.set(None);
                on_select.call(id.clone());
            }
            Some(marker) => popup.set(Some(marker.clone())),
            None => {
                popup.set(None);
                on_clear.call(());
            }
        }
    };
    let mut handle_tap = handle_click.clone();

    rsx! {
        div {
            id: MAP_CONTAINER_ID,
            class: "{container_class}",

            onwheel: move |evt: Event<WheelData>| {
                evt.prevent_default();
                let step = wheel_step(evt.data().delta());
                let current = *zoom.peek();
                let target = coords::clamp_zoom(i32::from(current) + step);
                if target == current {
                    return;
                }
                let pointer = evt.data().client_coordinates();
                let Some((cx, cy)) = to_container(pointer.x, pointer.y) else { return };
                let (w, h) = container_size();
                let before = Viewport {
                    center: *center.peek(),
                    zoom: current,
                    width: w,
                    height: h,
                };
                center.set(coords::zoom_center_at_cursor(&before, cx, cy, target));
                zoom.set(target);
            },

            onmousedown: move |evt: Event<MouseData>| {
                if evt.trigger_button() != Some(MouseButton::Primary) {
                    return;
                }
                let p = evt.client_coordinates();
                mouse_pan.set(Some(Pan::new((p.x, p.y), *center.peek(), MOUSE_PAN_RADIUS)));
            },

            onmousemove: move |evt: Event<MouseData>| {
                let Some(mut pan) = *mouse_pan.peek() else { return };
                let p = evt.client_coordinates();
                let (w, h) = container_size();
                if let Some(next) = pan.update((p.x, p.y), *zoom.peek(), w, h) {
                    center.set(next);
                }
                mouse_pan.set(Some(pan));
            },

            onmouseup: move |evt: Event<MouseData>| {
                let Some(pan) = mouse_pan.take() else { return };
                if pan.is_pan() {
                    return;
                }
                let p = evt.client_coordinates();
                if let Some(at) = to_container(p.x, p.y) {
                    handle_click(at);
                }
            },

            onmouseleave: move |_| mouse_pan.set(None),

            ontouchstart: move |evt: Event<TouchData>| {
                let touches = evt.data().touches();
                let pan = match touches.as_slice() {
                    [finger] => {
                        let p = finger.client_coordinates();
                        Some(Pan::new((p.x, p.y), *center.peek(), TOUCH_PAN_RADIUS))
                    }
                    _ => None,
                };
                touch_pan.set(pan);
            },

            ontouchmove: move |evt: Event<TouchData>| {
                evt.prevent_default();
                let Some(mut pan) = *touch_pan.peek() else { return };
                let touches = evt.data().touches();
                let [finger] = touches.as_slice() else { return };
                let p = finger.client_coordinates();
                let (w, h) = container_size();
                if let Some(next) = pan.update((p.x, p.y), *zoom.peek(), w, h) {
                    center.set(next);
                }
                touch_pan.set(Some(pan));
            },

            ontouchend: move |evt: Event<TouchData>| {
                if !evt.data().touches().is_empty() {
                    return;
                }
                let Some(pan) = touch_pan.take() else { return };
                if pan.is_pan() {
                    return;
                }
                let (x, y) = pan.origin();
                if let Some(at) = to_container(x, y) {
                    handle_tap(at);
                }
            },

            ontouchcancel: move |_| touch_pan.set(None),

            div { class: "map-tiles",
                for tile in tiles {
                    img {
                        key: "{tile.key.z}-{tile.key.x}-{tile.key.y}-{tile.left}",
                        class: "map-tile",
                        src: "{TILE_URL}/{tile.key.z}/{tile.key.x}/{tile.key.y}.png",
                        style: "left:{tile.left}px;top:{tile.top}px;",
                        draggable: "false",
                        alt: "",
                    }
                }
            }

            div {
                dangerous_inner_html: "{svg_html}",
                style: "position:absolute;top:0;left:0;width:100%;height:100%;pointer-events:none;",
            }

            if let (Some(marker), Some((px, py))) = (popup_marker, popup_pos) {
                div {
                    class: "map-popup",
                    style: "left:{px}px;top:{py}px;",
                    strong { "{marker.label}" }
                    if let Some(detail) = marker.detail {
                        div { class: "popup-detail", "{detail}" }
                    }
                }
            }

            div { class: "map-attribution",
                "© OpenStreetMap contributors"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estatemap_shared::models::{AmenityCategory, MarkerIcon};

    fn view() -> Viewport {
        Viewport {
            center: Coordinate { lat: 12.97, lng: 77.59 },
            zoom: 14,
            width: 800.0,
            height: 600.0,
        }
    }

    fn marker(label: &str, coordinate: Coordinate, project_id: Option<&str>) -> Marker {
        Marker {
            coordinate,
            icon: match project_id {
                Some(_) => MarkerIcon::Project,
                None => MarkerIcon::Amenity(AmenityCategory::Metro),
            },
            label: label.to_string(),
            detail: None,
            project_id: project_id.map(str::to_string),
        }
    }

    #[test]
    fn test_marker_at_hits_marker_under_click() {
        let v = view();
        let markers = vec![
            marker("A", Coordinate { lat: 12.98, lng: 77.60 }, Some("a")),
            marker("B", v.center, None),
        ];
        assert_eq!(marker_at(&markers, &v, (403.0, 298.0), HIT_RADIUS), Some(1));
        let (ax, ay) = v.to_screen(markers[0].coordinate);
        assert_eq!(marker_at(&markers, &v, (ax, ay), HIT_RADIUS), Some(0));
    }

    #[test]
    fn test_marker_at_misses_outside_threshold() {
        let v = view();
        let markers = vec![marker("A", v.center, Some("a"))];
        assert_eq!(marker_at(&markers, &v, (400.0 + HIT_RADIUS + 1.0, 300.0), HIT_RADIUS), None);
        assert_eq!(marker_at(&[], &v, (400.0, 300.0), HIT_RADIUS), None);
    }

    #[test]
    fn test_marker_at_prefers_topmost_on_tie() {
        let v = view();
        let markers = vec![marker("A", v.center, Some("a")), marker("B", v.center, None)];
        assert_eq!(marker_at(&markers, &v, (400.0, 300.0), HIT_RADIUS), Some(1));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("A&B <\"x\">"), "A&amp;B &lt;&quot;x&quot;&gt;");
        assert_eq!(escape_xml("St. John's"), "St. John&#39;s");
    }

    #[test]
    fn test_svg_contains_marker_titles_and_ring() {
        let v = view();
        let mut m = marker("Koramangala & Co", v.center, None);
        m.detail = Some("850 m".to_string());
        let svg = build_svg_content(&[m], &[], &v, Some(v.center));
        assert!(svg.contains("<title>Koramangala &amp; Co (850 m)</title>"));
        assert!(svg.contains(r#"r="28""#));
        assert!(svg.contains(">M</text>"));
    }

    #[test]
    fn test_svg_without_selection_has_no_ring() {
        let v = view();
        let svg = build_svg_content(&[marker("A", v.center, Some("a"))], &[], &v, None);
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn test_overlays_render_by_kind() {
        let v = view();
        let path = vec![
            Coordinate { lat: 12.96, lng: 77.58 },
            Coordinate { lat: 12.97, lng: 77.59 },
            Coordinate { lat: 12.98, lng: 77.58 },
        ];
        let overlays = vec![
            Overlay {
                name: Some("Purple Line".to_string()),
                kind: OverlayKind::Line,
                paths: vec![path.clone()],
            },
            Overlay {
                name: None,
                kind: OverlayKind::Area,
                paths: vec![path, vec![Coordinate { lat: 1.0, lng: 1.0 }]],
            },
        ];
        let svg = build_svg_content(&[], &overlays, &v, None);
        assert_eq!(svg.matches("<polyline").count(), 1);
        // Degenerate single-point path is skipped
        assert_eq!(svg.matches("<polygon").count(), 1);
        assert!(svg.contains("<title>Purple Line</title>"));
        assert!(svg.contains("400.0,300.0"));
    }
}
