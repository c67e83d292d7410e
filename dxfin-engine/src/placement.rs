use dxfin_core::drawing::{Entity, Placement};
use dxfin_core::geometry::{Bounds2D, Transform2D, Vector2};
use dxfin_core::settings::PlacementMode;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementOutcome {
    pub placement: Placement,
    /// 范围为空，平移被置零。
    pub empty: bool,
}

/// 由未缩放的范围、缩放因子与放置方式求出 `p' = scale * p + translation`。
///
/// 中心取缩放后范围的中点；`CenterOfDrawing` 把它移到原点，
/// `CustomCenter` 把它移到指定点。范围为空时不平移。
pub fn compute_placement(bounds: &Bounds2D, scale: f64, mode: PlacementMode) -> PlacementOutcome {
    let scaled_center = bounds.center().map(|center| center.as_vec2() * scale);
    let translation = match (mode, scaled_center) {
        (_, None) | (PlacementMode::None, _) => Vector2::ZERO,
        (PlacementMode::CenterOfDrawing, Some(center)) => Vector2::from(-center),
        (PlacementMode::CustomCenter { x, y }, Some(center)) => {
            Vector2::new(x - center.x, y - center.y)
        }
    };
    let transform = Transform2D::new(scale, translation);
    debug!(
        ?mode,
        scale,
        tx = translation.x(),
        ty = translation.y(),
        "放置变换"
    );
    PlacementOutcome {
        placement: Placement { mode, transform },
        empty: scaled_center.is_none(),
    }
}

/// 原地改写全部实体坐标。
pub fn apply_placement(entities: &mut [Entity], transform: &Transform2D) {
    if transform.is_identity() {
        return;
    }
    for entity in entities {
        entity.apply_transform(transform);
    }
}
