use dxfin_core::drawing::{UnitResolution, UnitSource};
use dxfin_core::settings::{LengthUnit, UnitSelection};
use tracing::debug;

/// 未声明单位时假定的图形单位。
pub const ASSUMED_UNIT: LengthUnit = LengthUnit::Millimeter;

/// 把单位选项与文件头 `$INSUNITS` 换算为相对宿主基准单位的缩放因子。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitResolver {
    host_unit: LengthUnit,
}

impl UnitResolver {
    #[inline]
    pub fn new(host_unit: LengthUnit) -> Self {
        Self { host_unit }
    }

    /// 单位的毫米当量除以宿主单位的毫米当量，恒为正数。
    #[inline]
    pub fn factor_for(&self, unit: LengthUnit) -> f64 {
        unit.millimeters() / self.host_unit.millimeters()
    }

    /// 显式选择优先；`Auto` 时查文件头，缺失或无法识别则按毫米处理并标记为假定。
    pub fn resolve(&self, selection: UnitSelection, insertion_units: Option<i64>) -> UnitResolution {
        let source = match selection.explicit_unit() {
            Some(unit) => UnitSource::Explicit(unit),
            None => match insertion_units.and_then(LengthUnit::from_insertion_code) {
                Some(unit) => UnitSource::Header(unit),
                None => UnitSource::Assumed(ASSUMED_UNIT),
            },
        };
        let factor = self.factor_for(source.unit());
        debug!(?selection, ?insertion_units, ?source, factor, "单位解析完成");
        UnitResolution {
            factor,
            source,
            host_unit: self.host_unit,
        }
    }
}

impl Default for UnitResolver {
    fn default() -> Self {
        Self::new(LengthUnit::Millimeter)
    }
}
