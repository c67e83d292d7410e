use std::collections::HashMap;

use dxfin_core::drawing::{DEFAULT_LAYER, Drawing, Entity, Layer, Placement, UnitResolution};
use dxfin_io::LayerDef;
use tracing::debug;

use crate::errors::ImportError;

/// 按图层分组已变换的实体并生成最终的 `Drawing`。
///
/// 图层按首次被实体使用的顺序排列，层内保持解析顺序；未声明图层的实体归入
/// [`DEFAULT_LAYER`]。图层表中的颜色、线宽、关闭与冻结状态写入对应图层。
pub fn assemble_drawing(
    name: &str,
    entities: Vec<Entity>,
    layer_table: &[LayerDef],
    unit: UnitResolution,
    placement: Placement,
) -> Result<Drawing, ImportError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ImportError::InvalidName);
    }

    let definitions: HashMap<&str, &LayerDef> = layer_table
        .iter()
        .map(|def| (def.name.as_str(), def))
        .collect();

    let mut layers: Vec<Layer> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for mut entity in entities {
        if entity.layer_name().is_empty() {
            entity.set_layer(DEFAULT_LAYER);
        }
        let slot = match index.get(entity.layer_name()) {
            Some(&slot) => slot,
            None => {
                let layer_name = entity.layer_name().to_string();
                let layer = new_layer(&layer_name, definitions.get(layer_name.as_str()).copied());
                layers.push(layer);
                index.insert(layer_name, layers.len() - 1);
                layers.len() - 1
            }
        };
        layers[slot].entities.push(entity);
    }

    debug!(drawing = name, layers = layers.len(), "图层分组完成");
    Ok(Drawing::new(name, layers, unit, placement))
}

fn new_layer(name: &str, definition: Option<&LayerDef>) -> Layer {
    let mut layer = Layer::new(name);
    if let Some(def) = definition {
        layer.color = def.color;
        layer.line_weight = def.line_weight;
        layer.is_visible = !def.is_off;
        layer.is_frozen = def.is_frozen;
    }
    layer
}

#[cfg(test)]
mod tests {
    use dxfin_core::drawing::{Point, UnitSource};
    use dxfin_core::geometry::{Point2, Transform2D};
    use dxfin_core::settings::{LengthUnit, PlacementMode};
    use dxfin_core::style::{Appearance, Color, LineWeight};

    use super::*;

    fn unit() -> UnitResolution {
        UnitResolution {
            factor: 1.0,
            source: UnitSource::Explicit(LengthUnit::Millimeter),
            host_unit: LengthUnit::Millimeter,
        }
    }

    fn placement() -> Placement {
        Placement {
            mode: PlacementMode::None,
            transform: Transform2D::IDENTITY,
        }
    }

    fn point(layer: &str, x: f64) -> Entity {
        Entity::Point(Point {
            position: Point2::new(x, 0.0),
            layer: layer.to_string(),
            appearance: Appearance::default(),
        })
    }

    #[test]
    fn groups_by_first_use_and_keeps_order() {
        let entities = vec![
            point("B", 1.0),
            point("A", 2.0),
            point("B", 3.0),
            point("", 4.0),
        ];
        let drawing = assemble_drawing("Plan", entities, &[], unit(), placement())
            .expect("assembly should succeed");
        let names: Vec<&str> = drawing.layers().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", DEFAULT_LAYER]);

        let b = drawing.layer("B").expect("layer B");
        let xs: Vec<f64> = b
            .entities
            .iter()
            .filter_map(|entity| match entity {
                Entity::Point(p) => Some(p.position.x()),
                _ => None,
            })
            .collect();
        assert_eq!(xs, vec![1.0, 3.0]);

        let default = drawing.layer(DEFAULT_LAYER).expect("default layer");
        assert_eq!(default.entities[0].layer_name(), DEFAULT_LAYER);
    }

    #[test]
    fn layer_table_attributes_are_applied() {
        let table = vec![LayerDef {
            name: "Hidden".to_string(),
            color: Color::Index(3),
            line_weight: LineWeight::Hundredths(35),
            is_off: true,
            is_frozen: true,
        }];
        let drawing = assemble_drawing(
            "Plan",
            vec![point("Hidden", 0.0), point("Plain", 0.0)],
            &table,
            unit(),
            placement(),
        )
        .expect("assembly should succeed");
        let hidden = drawing.layer("Hidden").expect("layer Hidden");
        assert_eq!(hidden.color, Color::Index(3));
        assert_eq!(hidden.line_weight, LineWeight::Hundredths(35));
        assert!(!hidden.is_visible);
        assert!(hidden.is_frozen);

        let plain = drawing.layer("Plain").expect("layer Plain");
        assert!(plain.is_visible);
        assert_eq!(plain.color, Color::Index(7));
    }

    #[test]
    fn blank_name_is_rejected() {
        for name in ["", "   "] {
            let err = assemble_drawing(name, vec![point("A", 0.0)], &[], unit(), placement())
                .expect_err("blank name must fail");
            assert!(matches!(err, ImportError::InvalidName));
        }
    }

    #[test]
    fn empty_input_produces_empty_drawing() {
        let drawing = assemble_drawing(" Site ", Vec::new(), &[], unit(), placement())
            .expect("assembly should succeed");
        assert_eq!(drawing.name(), "Site");
        assert!(drawing.layers().is_empty());
        assert!(drawing.is_empty());
    }
}
