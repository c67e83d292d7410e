pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        pub const ZERO: Vector2 = Vector2(DVec2::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，解析阶段边读边累积，供放置计算使用。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        /// 非有限坐标（NaN/inf）不参与累积。
        pub fn include_point(&mut self, point: Point2) {
            if !point.is_finite() {
                return;
            }
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        /// 边界框中心；空边界框返回 `None`。
        #[inline]
        pub fn center(&self) -> Option<Point2> {
            if self.is_empty() {
                return None;
            }
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Some(Point2::from_vec(center))
        }
    }

    impl Default for Bounds2D {
        fn default() -> Self {
            Self::empty()
        }
    }

    /// 均匀缩放后再平移：`p' = scale * p + translation`。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Transform2D {
        pub scale: f64,
        pub translation: Vector2,
    }

    impl Transform2D {
        pub const IDENTITY: Transform2D = Transform2D {
            scale: 1.0,
            translation: Vector2::ZERO,
        };

        #[inline]
        pub fn new(scale: f64, translation: Vector2) -> Self {
            Self { scale, translation }
        }

        #[inline]
        pub fn apply(&self, point: Point2) -> Point2 {
            Point2(point.0 * self.scale + self.translation.0)
        }

        /// 方向向量只缩放不平移。
        #[inline]
        pub fn apply_vector(&self, vector: Vector2) -> Vector2 {
            Vector2(vector.0 * self.scale)
        }

        #[inline]
        pub fn apply_length(&self, length: f64) -> f64 {
            length * self.scale
        }

        #[inline]
        pub fn is_identity(&self) -> bool {
            self.scale == 1.0 && self.translation.0 == DVec2::ZERO
        }
    }

    impl Default for Transform2D {
        fn default() -> Self {
            Self::IDENTITY
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn empty_bounds_have_no_center() {
            let bounds = Bounds2D::empty();
            assert!(bounds.is_empty());
            assert!(bounds.center().is_none());
        }

        #[test]
        fn bounds_ignore_non_finite_points() {
            let mut bounds = Bounds2D::empty();
            bounds.include_point(Point2::new(f64::NAN, 1.0));
            assert!(bounds.is_empty());
            bounds.include_point(Point2::new(2.0, -1.0));
            bounds.include_point(Point2::new(-4.0, 3.0));
            let center = bounds.center().expect("non-empty bounds");
            assert!((center.x() + 1.0).abs() < 1e-12);
            assert!((center.y() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn transform_scales_before_translating() {
            let transform = Transform2D::new(10.0, Vector2::new(-5.0, 2.0));
            let moved = transform.apply(Point2::new(1.0, 1.0));
            assert!((moved.x() - 5.0).abs() < 1e-12);
            assert!((moved.y() - 12.0).abs() < 1e-12);
            let axis = transform.apply_vector(Vector2::new(1.0, 0.0));
            assert!((axis.x() - 10.0).abs() < 1e-12);
            assert!(Transform2D::IDENTITY.is_identity());
            assert!(!transform.is_identity());
        }
    }
}

pub mod style {
    use serde::{Deserialize, Serialize};

    /// 实体/图层颜色，沿用 AutoCAD 颜色索引（ACI）约定。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum Color {
        #[default]
        ByLayer,
        ByBlock,
        Index(u8),
        Rgb { r: u8, g: u8, b: u8 },
    }

    impl Color {
        /// 组码 62 的取值。负数表示图层关闭，颜色取绝对值。
        pub fn from_index(index: i16) -> Self {
            match index {
                0 => Color::ByBlock,
                256 => Color::ByLayer,
                1..=255 => Color::Index(index as u8),
                i16::MIN..=-1 => Color::Index(index.unsigned_abs().min(255) as u8),
                _ => Color::ByLayer,
            }
        }

        /// 组码 420 的 24 位真彩色。
        pub fn from_true_color(raw: i64) -> Self {
            let value = raw & 0x00FF_FFFF;
            Color::Rgb {
                r: ((value >> 16) & 0xFF) as u8,
                g: ((value >> 8) & 0xFF) as u8,
                b: (value & 0xFF) as u8,
            }
        }
    }

    /// 线宽（组码 370），数值单位为 1/100 毫米。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum LineWeight {
        #[default]
        ByLayer,
        ByBlock,
        Default,
        Hundredths(u16),
    }

    impl LineWeight {
        pub fn from_value(value: i16) -> Self {
            match value {
                -1 => LineWeight::ByLayer,
                -2 => LineWeight::ByBlock,
                -3 => LineWeight::Default,
                v if v >= 0 => LineWeight::Hundredths(v as u16),
                _ => LineWeight::Default,
            }
        }
    }

    /// 每个实体共有的显示属性；`z_position` 为文件中的出现顺序。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    pub struct Appearance {
        pub color: Color,
        pub line_weight: LineWeight,
        pub z_position: u32,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn color_index_conventions() {
            assert_eq!(Color::from_index(256), Color::ByLayer);
            assert_eq!(Color::from_index(0), Color::ByBlock);
            assert_eq!(Color::from_index(3), Color::Index(3));
            assert_eq!(Color::from_index(-5), Color::Index(5));
        }

        #[test]
        fn true_color_splits_channels() {
            assert_eq!(
                Color::from_true_color(0x00FF_8000),
                Color::Rgb { r: 255, g: 128, b: 0 }
            );
        }

        #[test]
        fn line_weight_values() {
            assert_eq!(LineWeight::from_value(-1), LineWeight::ByLayer);
            assert_eq!(LineWeight::from_value(-3), LineWeight::Default);
            assert_eq!(LineWeight::from_value(25), LineWeight::Hundredths(25));
        }
    }
}

pub mod settings {
    use std::fmt;
    use std::path::{Path, PathBuf};
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};

    /// 长度单位及其毫米当量。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LengthUnit {
        #[default]
        Millimeter,
        Centimeter,
        Decimeter,
        Meter,
        Decameter,
        Hectometer,
        Kilometer,
        Micron,
        Inch,
        Foot,
        Yard,
        Mile,
        Microinch,
        Mil,
    }

    impl LengthUnit {
        pub fn millimeters(self) -> f64 {
            match self {
                LengthUnit::Millimeter => 1.0,
                LengthUnit::Centimeter => 10.0,
                LengthUnit::Decimeter => 100.0,
                LengthUnit::Meter => 1_000.0,
                LengthUnit::Decameter => 10_000.0,
                LengthUnit::Hectometer => 100_000.0,
                LengthUnit::Kilometer => 1_000_000.0,
                LengthUnit::Micron => 0.001,
                LengthUnit::Inch => 25.4,
                LengthUnit::Foot => 304.8,
                LengthUnit::Yard => 914.4,
                LengthUnit::Mile => 1_609_344.0,
                LengthUnit::Microinch => 0.000_025_4,
                LengthUnit::Mil => 0.025_4,
            }
        }

        /// 头段 `$INSUNITS` 代码到单位的映射；0（无单位）与未知代码返回 `None`。
        pub fn from_insertion_code(code: i64) -> Option<Self> {
            let unit = match code {
                1 => LengthUnit::Inch,
                2 => LengthUnit::Foot,
                3 => LengthUnit::Mile,
                4 => LengthUnit::Millimeter,
                5 => LengthUnit::Centimeter,
                6 => LengthUnit::Meter,
                7 => LengthUnit::Kilometer,
                8 => LengthUnit::Microinch,
                9 => LengthUnit::Mil,
                10 => LengthUnit::Yard,
                13 => LengthUnit::Micron,
                14 => LengthUnit::Decimeter,
                15 => LengthUnit::Decameter,
                16 => LengthUnit::Hectometer,
                _ => return None,
            };
            Some(unit)
        }

        pub fn name(self) -> &'static str {
            match self {
                LengthUnit::Millimeter => "millimeter",
                LengthUnit::Centimeter => "centimeter",
                LengthUnit::Decimeter => "decimeter",
                LengthUnit::Meter => "meter",
                LengthUnit::Decameter => "decameter",
                LengthUnit::Hectometer => "hectometer",
                LengthUnit::Kilometer => "kilometer",
                LengthUnit::Micron => "micron",
                LengthUnit::Inch => "inch",
                LengthUnit::Foot => "foot",
                LengthUnit::Yard => "yard",
                LengthUnit::Mile => "mile",
                LengthUnit::Microinch => "microinch",
                LengthUnit::Mil => "mil",
            }
        }
    }

    impl fmt::Display for LengthUnit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.name())
        }
    }

    impl FromStr for LengthUnit {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let unit = match s.trim().to_ascii_lowercase().as_str() {
                "mm" | "millimeter" => LengthUnit::Millimeter,
                "cm" | "centimeter" => LengthUnit::Centimeter,
                "dm" | "decimeter" => LengthUnit::Decimeter,
                "m" | "meter" => LengthUnit::Meter,
                "dam" | "decameter" => LengthUnit::Decameter,
                "hm" | "hectometer" => LengthUnit::Hectometer,
                "km" | "kilometer" => LengthUnit::Kilometer,
                "um" | "micron" => LengthUnit::Micron,
                "in" | "inch" => LengthUnit::Inch,
                "ft" | "foot" => LengthUnit::Foot,
                "yd" | "yard" => LengthUnit::Yard,
                "mi" | "mile" => LengthUnit::Mile,
                "microinch" => LengthUnit::Microinch,
                "mil" => LengthUnit::Mil,
                other => return Err(format!("未知的长度单位: {other}")),
            };
            Ok(unit)
        }
    }

    /// 导入对话框中的单位选项。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UnitSelection {
        #[default]
        Auto,
        Meter,
        Decimeter,
        Centimeter,
        Millimeter,
    }

    impl UnitSelection {
        /// 显式单位；`Auto` 返回 `None`。
        pub fn explicit_unit(self) -> Option<LengthUnit> {
            match self {
                UnitSelection::Auto => None,
                UnitSelection::Meter => Some(LengthUnit::Meter),
                UnitSelection::Decimeter => Some(LengthUnit::Decimeter),
                UnitSelection::Centimeter => Some(LengthUnit::Centimeter),
                UnitSelection::Millimeter => Some(LengthUnit::Millimeter),
            }
        }
    }

    impl FromStr for UnitSelection {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "auto" => Ok(UnitSelection::Auto),
                "m" | "meter" => Ok(UnitSelection::Meter),
                "dm" | "decimeter" => Ok(UnitSelection::Decimeter),
                "cm" | "centimeter" => Ok(UnitSelection::Centimeter),
                "mm" | "millimeter" => Ok(UnitSelection::Millimeter),
                other => Err(format!(
                    "未知的单位选项 {other}（可选 auto/meter/decimeter/centimeter/millimeter）"
                )),
            }
        }
    }

    /// 放置方式：不移动、图形中心移到原点、或图形中心移到指定点。
    #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
    #[serde(tag = "mode", rename_all = "snake_case")]
    pub enum PlacementMode {
        #[default]
        None,
        CenterOfDrawing,
        CustomCenter { x: f64, y: f64 },
    }

    /// 单次导入的全部输入，导入过程中只读。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct ImportSettings {
        pub file_path: PathBuf,
        pub drawing_name: String,
        pub unit: UnitSelection,
        pub placement: PlacementMode,
        pub import_text: bool,
        /// 过大的文字高度（> 15 图形单位）缩小为十分之一。
        #[serde(default)]
        pub fix_font_heights: bool,
        /// 宿主模型的基准单位，缩放因子以它为 1。
        #[serde(default)]
        pub host_unit: LengthUnit,
    }

    impl ImportSettings {
        pub fn new(file_path: impl AsRef<Path>, drawing_name: impl Into<String>) -> Self {
            Self {
                file_path: file_path.as_ref().to_path_buf(),
                drawing_name: drawing_name.into(),
                unit: UnitSelection::Auto,
                placement: PlacementMode::None,
                import_text: true,
                fix_font_heights: false,
                host_unit: LengthUnit::Millimeter,
            }
        }

        pub fn with_unit(mut self, unit: UnitSelection) -> Self {
            self.unit = unit;
            self
        }

        pub fn with_placement(mut self, placement: PlacementMode) -> Self {
            self.placement = placement;
            self
        }

        pub fn with_import_text(mut self, import_text: bool) -> Self {
            self.import_text = import_text;
            self
        }

        pub fn with_fix_font_heights(mut self, fix: bool) -> Self {
            self.fix_font_heights = fix;
            self
        }

        pub fn with_host_unit(mut self, host_unit: LengthUnit) -> Self {
            self.host_unit = host_unit;
            self
        }
    }

}

pub mod drawing {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};
    use std::fmt;

    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Transform2D, Vector2};
    use crate::settings::{LengthUnit, PlacementMode};
    use crate::style::{Appearance, Color, LineWeight};

    /// 未声明图层的实体挂到该图层。
    pub const DEFAULT_LAYER: &str = "0";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum EntityKind {
        Point,
        Line,
        Polyline,
        Circle,
        Arc,
        Ellipse,
        Solid,
        Text,
    }

    impl EntityKind {
        pub fn name(self) -> &'static str {
            match self {
                EntityKind::Point => "point",
                EntityKind::Line => "line",
                EntityKind::Polyline => "polyline",
                EntityKind::Circle => "circle",
                EntityKind::Arc => "arc",
                EntityKind::Ellipse => "ellipse",
                EntityKind::Solid => "solid",
                EntityKind::Text => "text",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Point(Point),
        Line(Line),
        Polyline(Polyline),
        Circle(Circle),
        Arc(Arc),
        Ellipse(Ellipse),
        Solid(Solid),
        Text(Text),
    }

    impl Entity {
        #[inline]
        pub fn kind(&self) -> EntityKind {
            match self {
                Entity::Point(_) => EntityKind::Point,
                Entity::Line(_) => EntityKind::Line,
                Entity::Polyline(_) => EntityKind::Polyline,
                Entity::Circle(_) => EntityKind::Circle,
                Entity::Arc(_) => EntityKind::Arc,
                Entity::Ellipse(_) => EntityKind::Ellipse,
                Entity::Solid(_) => EntityKind::Solid,
                Entity::Text(_) => EntityKind::Text,
            }
        }

        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Point(point) => &point.layer,
                Entity::Line(line) => &line.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Arc(arc) => &arc.layer,
                Entity::Ellipse(ellipse) => &ellipse.layer,
                Entity::Solid(solid) => &solid.layer,
                Entity::Text(text) => &text.layer,
            }
        }

        pub fn set_layer(&mut self, layer: impl Into<String>) {
            let layer = layer.into();
            match self {
                Entity::Point(point) => point.layer = layer,
                Entity::Line(line) => line.layer = layer,
                Entity::Polyline(polyline) => polyline.layer = layer,
                Entity::Circle(circle) => circle.layer = layer,
                Entity::Arc(arc) => arc.layer = layer,
                Entity::Ellipse(ellipse) => ellipse.layer = layer,
                Entity::Solid(solid) => solid.layer = layer,
                Entity::Text(text) => text.layer = layer,
            }
        }

        #[inline]
        pub fn appearance(&self) -> &Appearance {
            match self {
                Entity::Point(point) => &point.appearance,
                Entity::Line(line) => &line.appearance,
                Entity::Polyline(polyline) => &polyline.appearance,
                Entity::Circle(circle) => &circle.appearance,
                Entity::Arc(arc) => &arc.appearance,
                Entity::Ellipse(ellipse) => &ellipse.appearance,
                Entity::Solid(solid) => &solid.appearance,
                Entity::Text(text) => &text.appearance,
            }
        }

        /// 计算实体的 2D 轴对齐范围；文字退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Point(point) => bounds.include_point(point.position),
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                }
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Arc(arc) => arc_bounds(arc, &mut bounds),
                Entity::Ellipse(ellipse) => ellipse_bounds(ellipse, &mut bounds),
                Entity::Solid(solid) => {
                    for corner in solid.corners() {
                        bounds.include_point(corner);
                    }
                }
                Entity::Text(text) => bounds.include_point(text.insert),
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        /// 原地改写全部坐标：先缩放后平移。角度与 bulge 在正的均匀缩放下不变。
        pub fn apply_transform(&mut self, transform: &Transform2D) {
            match self {
                Entity::Point(point) => point.position = transform.apply(point.position),
                Entity::Line(line) => {
                    line.start = transform.apply(line.start);
                    line.end = transform.apply(line.end);
                }
                Entity::Polyline(polyline) => {
                    for vertex in &mut polyline.vertices {
                        vertex.position = transform.apply(vertex.position);
                    }
                }
                Entity::Circle(circle) => {
                    circle.center = transform.apply(circle.center);
                    circle.radius = transform.apply_length(circle.radius);
                }
                Entity::Arc(arc) => {
                    arc.center = transform.apply(arc.center);
                    arc.radius = transform.apply_length(arc.radius);
                }
                Entity::Ellipse(ellipse) => {
                    ellipse.center = transform.apply(ellipse.center);
                    ellipse.major_axis = transform.apply_vector(ellipse.major_axis);
                }
                Entity::Solid(solid) => {
                    solid.first_corner = transform.apply(solid.first_corner);
                    solid.second_corner = transform.apply(solid.second_corner);
                    solid.third_corner = transform.apply(solid.third_corner);
                    solid.fourth_corner = transform.apply(solid.fourth_corner);
                }
                Entity::Text(text) => {
                    text.insert = transform.apply(text.insert);
                    text.height = transform.apply_length(text.height);
                }
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Point {
        pub position: Point2,
        pub layer: String,
        pub appearance: Appearance,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
        pub layer: String,
        pub appearance: Appearance,
    }

    /// 多段线，顶点顺序与文件一致。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
        pub appearance: Appearance,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
        pub appearance: Appearance,
    }

    /// 圆弧实体，角度以弧度形式储存，遵循数学正方向。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
        pub layer: String,
        pub appearance: Appearance,
    }

    /// 椭圆实体，记录主轴向量与参数范围（单位为弧度）。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
        pub start_parameter: f64,
        pub end_parameter: f64,
        pub layer: String,
        pub appearance: Appearance,
    }

    /// 二维填充四边形（SOLID），角点按组码 10/11/12/13 的顺序保存。
    /// 只有三个角点时第四点与第三点重合。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Solid {
        pub first_corner: Point2,
        pub second_corner: Point2,
        pub third_corner: Point2,
        pub fourth_corner: Point2,
        pub layer: String,
        pub appearance: Appearance,
    }

    impl Solid {
        #[inline]
        pub fn is_triangle(&self) -> bool {
            self.third_corner.as_vec2().distance(self.fourth_corner.as_vec2()) < 1e-10
        }

        /// 沿轮廓的角点顺序；DXF 中第三、第四角点是交叉存放的。
        pub fn corners(&self) -> Vec<Point2> {
            if self.is_triangle() {
                vec![self.first_corner, self.second_corner, self.third_corner]
            } else {
                vec![
                    self.first_corner,
                    self.second_corner,
                    self.fourth_corner,
                    self.third_corner,
                ]
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum TextAlignment {
        #[default]
        Left,
        Center,
        Right,
    }

    impl TextAlignment {
        /// TEXT 组码 72 / MTEXT 组码 71 换算后的水平对齐。
        pub fn from_horizontal_code(code: i64) -> Self {
            match code {
                1 | 4 => TextAlignment::Center,
                2 => TextAlignment::Right,
                _ => TextAlignment::Left,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub alignment: TextAlignment,
        pub layer: String,
        pub appearance: Appearance,
    }

    /// 绘图中的图层，实体按解析顺序保存。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: Color,
        pub line_weight: LineWeight,
        pub is_visible: bool,
        pub is_frozen: bool,
        pub entities: Vec<Entity>,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                color: Color::Index(7),
                line_weight: LineWeight::Default,
                is_visible: true,
                is_frozen: false,
                entities: Vec::new(),
            }
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for entity in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    /// 缩放因子的来源，便于向用户解释结果。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "source", content = "unit", rename_all = "snake_case")]
    pub enum UnitSource {
        Explicit(LengthUnit),
        Header(LengthUnit),
        Assumed(LengthUnit),
    }

    impl UnitSource {
        #[inline]
        pub fn unit(self) -> LengthUnit {
            match self {
                UnitSource::Explicit(unit) | UnitSource::Header(unit) | UnitSource::Assumed(unit) => {
                    unit
                }
            }
        }

        #[inline]
        pub fn is_assumed(self) -> bool {
            matches!(self, UnitSource::Assumed(_))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct UnitResolution {
        pub factor: f64,
        pub source: UnitSource,
        pub host_unit: LengthUnit,
    }

    /// 实际生效的放置方式与变换，仅作记录。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Placement {
        pub mode: PlacementMode,
        pub transform: Transform2D,
    }

    /// 导入完成的绘图；交给宿主后不再修改。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        name: String,
        layers: Vec<Layer>,
        unit: UnitResolution,
        placement: Placement,
    }

    impl Drawing {
        pub fn new(
            name: impl Into<String>,
            layers: Vec<Layer>,
            unit: UnitResolution,
            placement: Placement,
        ) -> Self {
            Self {
                name: name.into(),
                layers,
                unit,
                placement,
            }
        }

        #[inline]
        pub fn name(&self) -> &str {
            &self.name
        }

        #[inline]
        pub fn layers(&self) -> &[Layer] {
            &self.layers
        }

        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.iter().find(|layer| layer.name == name)
        }

        #[inline]
        pub fn unit(&self) -> &UnitResolution {
            &self.unit
        }

        #[inline]
        pub fn placement(&self) -> &Placement {
            &self.placement
        }

        pub fn entities(&self) -> impl Iterator<Item = &Entity> {
            self.layers.iter().flat_map(|layer| layer.entities.iter())
        }

        pub fn entity_count(&self) -> usize {
            self.layers.iter().map(|layer| layer.entities.len()).sum()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entity_count() == 0
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            for layer in &self.layers {
                if let Some(layer_bounds) = layer.bounds() {
                    bounds.include_bounds(&layer_bounds);
                }
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }

        pub fn summary(&self) -> ImportSummary {
            let mut summary = ImportSummary {
                layers: self.layers.len(),
                ..ImportSummary::default()
            };
            for entity in self.entities() {
                match entity.kind() {
                    EntityKind::Point => summary.points += 1,
                    EntityKind::Line => summary.lines += 1,
                    EntityKind::Polyline => summary.polylines += 1,
                    EntityKind::Circle => summary.circles += 1,
                    EntityKind::Arc => summary.arcs += 1,
                    EntityKind::Ellipse => summary.ellipses += 1,
                    EntityKind::Solid => summary.solids += 1,
                    EntityKind::Text => summary.texts += 1,
                }
            }
            summary
        }
    }

    /// 各类图元的数量统计。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct ImportSummary {
        pub layers: usize,
        pub points: usize,
        pub lines: usize,
        pub polylines: usize,
        pub circles: usize,
        pub arcs: usize,
        pub ellipses: usize,
        pub solids: usize,
        pub texts: usize,
    }

    impl fmt::Display for ImportSummary {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Layers:\t\t{}", self.layers)?;
            writeln!(f, "Points:\t\t{}", self.points)?;
            writeln!(f, "Lines:\t\t{}", self.lines)?;
            writeln!(f, "Polylines:\t{}", self.polylines)?;
            writeln!(f, "Circles:\t{}", self.circles)?;
            writeln!(f, "Arcs:\t\t{}", self.arcs)?;
            writeln!(f, "Ellipses:\t{}", self.ellipses)?;
            writeln!(f, "Solids:\t\t{}", self.solids)?;
            write!(f, "Texts:\t\t{}", self.texts)
        }
    }

    fn normalize_angle(angle: f64) -> f64 {
        let mut result = angle % TAU;
        if result < 0.0 {
            result += TAU;
        }
        result
    }

    fn canonical_interval(start: f64, end: f64) -> (f64, f64) {
        let start = normalize_angle(start);
        let mut end = normalize_angle(end);
        if (end - start).abs() < 1e-9 {
            end = start + TAU;
        } else if end < start {
            end += TAU;
        }
        (start, end)
    }

    fn arc_point(center: Point2, radius: f64, angle: f64) -> Point2 {
        let offset = Vector2::new(radius * angle.cos(), radius * angle.sin());
        center.translate(offset)
    }

    fn arc_bounds(arc: &Arc, bounds: &mut Bounds2D) {
        let radius = arc.radius.abs();
        if radius <= f64::EPSILON {
            bounds.include_point(arc.center);
            return;
        }

        let (start, end) = canonical_interval(arc.start_angle, arc.end_angle);
        bounds.include_point(arc_point(arc.center, radius, start));
        bounds.include_point(arc_point(arc.center, radius, end));

        const QUADRANTS: [f64; 4] = [0.0, FRAC_PI_2, PI, FRAC_PI_2 * 3.0];
        for base in QUADRANTS {
            let mut candidate = base;
            while candidate < start {
                candidate += TAU;
            }
            if candidate <= end {
                bounds.include_point(arc_point(arc.center, radius, candidate));
            }
        }
    }

    fn ellipse_bounds(ellipse: &Ellipse, bounds: &mut Bounds2D) {
        let major_vec = ellipse.major_axis.as_vec2();
        let major_length = major_vec.length();

        if major_length <= f64::EPSILON {
            bounds.include_point(ellipse.center);
            return;
        }
        let minor_length = major_length * ellipse.ratio.abs();
        let major_dir = major_vec / major_length;
        let minor_dir = DVec2::new(-major_dir.y, major_dir.x);
        let minor_vec = minor_dir * minor_length;

        // 参数先归一到 [0, 2π)，跨度不超过一整圈
        let (start, end) = (ellipse.start_parameter, ellipse.end_parameter);
        let (start, span) = if start.is_finite() && end.is_finite() {
            let (start, end) = canonical_interval(start, end);
            (start, end - start)
        } else {
            (0.0, TAU)
        };
        let step_count = ((span / (TAU / 64.0)).ceil() as usize).max(16);
        for i in 0..=step_count {
            let t = start + span * (i as f64 / step_count as f64);
            let offset = major_vec * t.cos() + minor_vec * t.sin();
            let point = ellipse.center.translate(Vector2::from(offset));
            bounds.include_point(point);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::settings::LengthUnit;

        fn line(layer: &str, start: (f64, f64), end: (f64, f64)) -> Entity {
            Entity::Line(Line {
                start: Point2::new(start.0, start.1),
                end: Point2::new(end.0, end.1),
                layer: layer.to_string(),
                appearance: Appearance::default(),
            })
        }

        fn identity_metadata() -> (UnitResolution, Placement) {
            (
                UnitResolution {
                    factor: 1.0,
                    source: UnitSource::Explicit(LengthUnit::Millimeter),
                    host_unit: LengthUnit::Millimeter,
                },
                Placement {
                    mode: PlacementMode::None,
                    transform: Transform2D::IDENTITY,
                },
            )
        }

        #[test]
        fn quarter_arc_bounds_cover_only_its_quadrant() {
            let arc = Entity::Arc(Arc {
                center: Point2::new(0.0, 0.0),
                radius: 2.0,
                start_angle: 0.0,
                end_angle: FRAC_PI_2,
                layer: "0".to_string(),
                appearance: Appearance::default(),
            });
            let bounds = arc.bounds().expect("arc bounds");
            assert!(bounds.min().x().abs() < 1e-9);
            assert!(bounds.min().y().abs() < 1e-9);
            assert!((bounds.max().x() - 2.0).abs() < 1e-9);
            assert!((bounds.max().y() - 2.0).abs() < 1e-9);
        }

        #[test]
        fn ellipse_bounds_stay_within_one_turn() {
            let ellipse = |start_parameter: f64, end_parameter: f64| {
                Entity::Ellipse(Ellipse {
                    center: Point2::new(0.0, 0.0),
                    major_axis: Vector2::new(4.0, 0.0),
                    ratio: 0.5,
                    start_parameter,
                    end_parameter,
                    layer: "0".to_string(),
                    appearance: Appearance::default(),
                })
            };
            for (start, end) in [(1e18, 0.0), (0.0, 1e15), (f64::NAN, 1.0)] {
                let bounds = ellipse(start, end).bounds().expect("ellipse bounds");
                assert!(bounds.max().x() <= 4.0 + 1e-9);
                assert!(bounds.max().y() <= 2.0 + 1e-9);
            }

            let upper = ellipse(0.0, PI).bounds().expect("half ellipse bounds");
            assert!(upper.min().y().abs() < 1e-9);
            assert!((upper.max().y() - 2.0).abs() < 1e-9);
        }

        #[test]
        fn solid_corners_follow_outline_order() {
            let mut solid = Entity::Solid(Solid {
                first_corner: Point2::new(0.0, 0.0),
                second_corner: Point2::new(4.0, 0.0),
                third_corner: Point2::new(0.0, 2.0),
                fourth_corner: Point2::new(4.0, 2.0),
                layer: "Fill".to_string(),
                appearance: Appearance::default(),
            });
            solid.apply_transform(&Transform2D::new(2.0, Vector2::new(1.0, 0.0)));
            let bounds = solid.bounds().expect("solid bounds");
            assert!((bounds.min().x() - 1.0).abs() < 1e-12);
            assert!((bounds.max().x() - 9.0).abs() < 1e-12);
            assert!((bounds.max().y() - 4.0).abs() < 1e-12);
            match solid {
                Entity::Solid(solid) => {
                    assert!(!solid.is_triangle());
                    let xs: Vec<f64> = solid.corners().iter().map(|p| p.x()).collect();
                    assert_eq!(xs, vec![1.0, 9.0, 9.0, 1.0]);
                }
                other => panic!("unexpected entity {other:?}"),
            }
        }

        #[test]
        fn transform_rewrites_every_coordinate() {
            let transform = Transform2D::new(2.0, Vector2::new(1.0, -1.0));
            let mut circle = Entity::Circle(Circle {
                center: Point2::new(1.0, 1.0),
                radius: 3.0,
                layer: "0".to_string(),
                appearance: Appearance::default(),
            });
            circle.apply_transform(&transform);
            match circle {
                Entity::Circle(circle) => {
                    assert!((circle.center.x() - 3.0).abs() < 1e-12);
                    assert!((circle.center.y() - 1.0).abs() < 1e-12);
                    assert!((circle.radius - 6.0).abs() < 1e-12);
                }
                other => panic!("unexpected entity {other:?}"),
            }

            let mut text = Entity::Text(Text {
                insert: Point2::new(0.0, 0.0),
                content: "A-01".to_string(),
                height: 2.5,
                rotation: 0.0,
                alignment: TextAlignment::Left,
                layer: "ANNOT".to_string(),
                appearance: Appearance::default(),
            });
            text.apply_transform(&transform);
            match text {
                Entity::Text(text) => {
                    assert_eq!(text.content, "A-01");
                    assert!((text.insert.x() - 1.0).abs() < 1e-12);
                    assert!((text.height - 5.0).abs() < 1e-12);
                }
                other => panic!("unexpected entity {other:?}"),
            }
        }

        #[test]
        fn drawing_summary_counts_per_kind() {
            let mut walls = Layer::new("Walls");
            walls.entities.push(line("Walls", (0.0, 0.0), (10.0, 0.0)));
            walls.entities.push(line("Walls", (10.0, 0.0), (10.0, 10.0)));
            let mut marks = Layer::new("Marks");
            marks.entities.push(Entity::Point(Point {
                position: Point2::new(5.0, 5.0),
                layer: "Marks".to_string(),
                appearance: Appearance::default(),
            }));
            let (unit, placement) = identity_metadata();
            let drawing = Drawing::new("Plan", vec![walls, marks], unit, placement);

            let summary = drawing.summary();
            assert_eq!(summary.layers, 2);
            assert_eq!(summary.lines, 2);
            assert_eq!(summary.points, 1);
            assert_eq!(drawing.entity_count(), 3);
            assert!(drawing.layer("Walls").is_some());
            assert!(drawing.layer("walls").is_none());

            let bounds = drawing.bounds().expect("drawing bounds");
            assert!((bounds.max().x() - 10.0).abs() < 1e-12);
            assert!(summary.to_string().contains("Lines:\t\t2"));
        }

        #[test]
        fn empty_drawing_has_no_bounds() {
            let (unit, placement) = identity_metadata();
            let drawing = Drawing::new("Empty", Vec::new(), unit, placement);
            assert!(drawing.is_empty());
            assert!(drawing.bounds().is_none());
            assert_eq!(drawing.summary(), ImportSummary::default());
        }

        #[test]
        fn drawing_serializes_unit_source_with_tag() {
            let (unit, placement) = identity_metadata();
            let drawing = Drawing::new("Plan", Vec::new(), unit, placement);
            let value = serde_json::to_value(&drawing).expect("serialize drawing");
            assert_eq!(value["name"], "Plan");
            assert_eq!(value["unit"]["source"]["source"], "explicit");
            assert_eq!(value["unit"]["source"]["unit"], "millimeter");
            assert_eq!(value["placement"]["mode"]["mode"], "none");
        }
    }
}
