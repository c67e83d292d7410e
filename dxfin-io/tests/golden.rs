use dxfin_core::drawing::Entity;
use dxfin_core::geometry::Point2;
use dxfin_io::ParsedDrawing;
use serde_json::{Value, json};

const PRECISION: f64 = 1e6;

fn round(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}

fn point(point: Point2) -> Value {
    json!([round(point.x()), round(point.y())])
}

/// 把解析结果转换为便于比较的 JSON 快照，浮点数保留 6 位小数。
pub fn snapshot(parsed: &ParsedDrawing) -> Value {
    let layers: Vec<Value> = parsed
        .layers
        .iter()
        .map(|layer| {
            json!({
                "name": layer.name,
                "off": layer.is_off,
                "frozen": layer.is_frozen,
            })
        })
        .collect();
    let entities: Vec<Value> = parsed.entities.iter().map(entity_snapshot).collect();
    let skipped: Vec<Value> = parsed
        .skipped
        .iter()
        .map(|skipped| {
            json!({
                "type": skipped.source.entity_type,
                "layer": skipped.layer,
            })
        })
        .collect();
    json!({
        "layers": layers,
        "entities": entities,
        "skipped": skipped,
    })
}

fn entity_snapshot(entity: &Entity) -> Value {
    let data = match entity {
        Entity::Point(p) => json!({ "position": point(p.position) }),
        Entity::Line(line) => json!({ "start": point(line.start), "end": point(line.end) }),
        Entity::Polyline(polyline) => json!({
            "closed": polyline.is_closed,
            "vertices": polyline
                .vertices
                .iter()
                .map(|vertex| json!({ "at": point(vertex.position), "bulge": round(vertex.bulge) }))
                .collect::<Vec<_>>(),
        }),
        Entity::Circle(circle) => json!({
            "center": point(circle.center),
            "radius": round(circle.radius),
        }),
        Entity::Arc(arc) => json!({
            "center": point(arc.center),
            "radius": round(arc.radius),
            "start": round(arc.start_angle),
            "end": round(arc.end_angle),
        }),
        Entity::Ellipse(ellipse) => json!({
            "center": point(ellipse.center),
            "major": [round(ellipse.major_axis.x()), round(ellipse.major_axis.y())],
            "ratio": round(ellipse.ratio),
        }),
        Entity::Solid(solid) => json!({
            "corners": solid.corners().into_iter().map(point).collect::<Vec<_>>(),
        }),
        Entity::Text(text) => json!({
            "insert": point(text.insert),
            "content": text.content,
            "height": round(text.height),
        }),
    };
    json!({
        "kind": entity.kind().name(),
        "layer": entity.layer_name(),
        "data": data,
    })
}
