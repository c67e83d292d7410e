use std::f64::consts::TAU;
use std::fmt;

use dxfin_core::drawing::{
    Arc, Circle, Ellipse, Entity, Line, Point, Polyline, PolylineVertex, Solid, Text,
    TextAlignment,
};
use dxfin_core::geometry::{Bounds2D, Point2, Vector2};
use dxfin_core::style::{Appearance, Color, LineWeight};
use tracing::{debug, warn};

use crate::DxfError;
use crate::reader::{Token, TokenReader};
use crate::text::{decode_mtext_content, decode_text_content};

/// 头段中导入需要的变量。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderInfo {
    /// `$INSUNITS`（组码 70）。
    pub insertion_units: Option<i64>,
    /// `$ACADVER`。
    pub version: Option<String>,
    /// `$DWGCODEPAGE`。
    pub code_page: Option<String>,
}

/// LAYER 表中的一条记录。
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDef {
    pub name: String,
    pub color: Color,
    pub line_weight: LineWeight,
    pub is_off: bool,
    pub is_frozen: bool,
}

/// 记录在文件中的来源，用于诊断。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMarker {
    pub entity_type: String,
    pub line: usize,
}

/// 实体被跳过的原因。
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnknownType,
    MissingField { field: &'static str, code: i32 },
    InvalidValue { code: i32, raw: String },
    DuplicateField { code: i32 },
    Degenerate(&'static str),
    Excluded(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownType => write!(f, "暂不支持的实体类型"),
            SkipReason::MissingField { field, code } => {
                write!(f, "缺少{field}（组码 {code}）")
            }
            SkipReason::InvalidValue { code, raw } => {
                write!(f, "组码 {code} 的值 \"{raw}\" 无法解析")
            }
            SkipReason::DuplicateField { code } => write!(f, "组码 {code} 重复出现"),
            SkipReason::Degenerate(message) | SkipReason::Excluded(message) => {
                f.write_str(message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Entity(Entity),
    LayerDef(LayerDef),
    Unsupported {
        layer: Option<String>,
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub source: SourceMarker,
    pub body: RecordBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntity {
    pub source: SourceMarker,
    pub layer: Option<String>,
    pub reason: SkipReason,
}

impl fmt::Display for SkippedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "第 {} 行的 {} 已跳过：{}",
            self.source.line, self.source.entity_type, self.reason
        )?;
        if let Some(layer) = &self.layer {
            write!(f, "（图层 {layer}）")?;
        }
        Ok(())
    }
}

/// 一次解析的全部结果。
#[derive(Debug, Clone, Default)]
pub struct ParsedDrawing {
    pub header: HeaderInfo,
    pub layers: Vec<LayerDef>,
    pub entities: Vec<Entity>,
    pub skipped: Vec<SkippedEntity>,
    /// 除文字外全部有效坐标的范围。
    pub geometry_bounds: Bounds2D,
    /// 文字插入点的范围。
    pub text_bounds: Bounds2D,
    pub reached_eof: bool,
}

impl ParsedDrawing {
    pub fn bounds(&self, include_text: bool) -> Bounds2D {
        let mut bounds = self.geometry_bounds;
        if include_text {
            bounds.include_bounds(&self.text_bounds);
        }
        bounds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Outside,
    Header,
    Tables,
    Entities,
    Skipped,
}

/// 逐段读取 token，按实体产出记录；单个实体的问题只降级为 `Unsupported`。
pub struct EntityParser<'a> {
    reader: TokenReader<'a>,
    section: Section,
    header: HeaderInfo,
    header_variable: Option<String>,
    next_z: u32,
    reached_eof: bool,
    finished: bool,
}

impl<'a> EntityParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            reader: TokenReader::new(source),
            section: Section::Outside,
            header: HeaderInfo::default(),
            header_variable: None,
            next_z: 0,
            reached_eof: false,
            finished: false,
        }
    }

    /// 把记录流归并为有效实体、图层定义与跳过列表，同时累积范围。
    pub fn parse(mut self) -> Result<ParsedDrawing, DxfError> {
        let mut parsed = ParsedDrawing::default();
        while let Some(record) = self.next_record()? {
            match record.body {
                RecordBody::Entity(entity) => {
                    if let Some(bounds) = entity.bounds() {
                        if matches!(entity, Entity::Text(_)) {
                            parsed.text_bounds.include_bounds(&bounds);
                        } else {
                            parsed.geometry_bounds.include_bounds(&bounds);
                        }
                    }
                    parsed.entities.push(entity);
                }
                RecordBody::LayerDef(layer) => parsed.layers.push(layer),
                RecordBody::Unsupported { layer, reason } => {
                    debug!(
                        entity = %record.source.entity_type,
                        line = record.source.line,
                        %reason,
                        "跳过实体"
                    );
                    parsed.skipped.push(SkippedEntity {
                        source: record.source,
                        layer,
                        reason,
                    });
                }
            }
        }
        parsed.header = self.header;
        parsed.reached_eof = self.reached_eof;
        debug!(
            entities = parsed.entities.len(),
            layers = parsed.layers.len(),
            skipped = parsed.skipped.len(),
            "DXF 解析完成"
        );
        Ok(parsed)
    }

    /// 读取下一条记录；文件结束（EOF 标记或数据耗尽）时返回 `None`。
    pub fn next_record(&mut self) -> Result<Option<EntityRecord>, DxfError> {
        loop {
            if self.finished {
                return Ok(None);
            }
            let token = match self.reader.next_token() {
                Ok(Some(token)) => token,
                Ok(None) => {
                    if self.section != Section::Outside {
                        warn!(line = self.reader.line_number(), "段未以 ENDSEC 结束");
                    }
                    warn!("文件缺少 EOF 标记");
                    self.finished = true;
                    return Ok(None);
                }
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            };

            let record = match self.section {
                Section::Outside => {
                    self.enter_section(token)?;
                    None
                }
                Section::Header => {
                    self.read_header_token(token);
                    None
                }
                Section::Tables => self.read_table_token(token)?,
                Section::Entities => self.read_entity_token(token)?,
                Section::Skipped => {
                    if token.is_marker("ENDSEC") {
                        self.section = Section::Outside;
                    }
                    None
                }
            };
            if let Some(record) = record {
                return Ok(Some(record));
            }
        }
    }

    fn enter_section(&mut self, token: Token) -> Result<(), DxfError> {
        match token.marker() {
            Some("SECTION") => {}
            Some("EOF") => {
                self.reached_eof = true;
                self.finished = true;
                return Ok(());
            }
            _ => {
                debug!(line = token.line, code = token.code, "段外的多余数据，已忽略");
                return Ok(());
            }
        }

        let name = match self.reader.next_token()? {
            Some(name) if name.code == 2 => name.raw().trim().to_string(),
            Some(other) => {
                self.reader.put_back(other);
                String::new()
            }
            None => return Ok(()),
        };
        self.section = match name.as_str() {
            "HEADER" => Section::Header,
            "TABLES" => Section::Tables,
            "ENTITIES" => Section::Entities,
            _ => Section::Skipped,
        };
        debug!(section = %name, line = token.line, "进入段");
        Ok(())
    }

    fn read_header_token(&mut self, token: Token) {
        if token.is_marker("ENDSEC") {
            self.section = Section::Outside;
            self.header_variable = None;
            return;
        }
        if token.code == 9 {
            self.header_variable = Some(token.raw().trim().to_string());
            return;
        }
        match (self.header_variable.as_deref(), token.code) {
            (Some("$INSUNITS"), 70) => self.header.insertion_units = token.as_i64(),
            (Some("$ACADVER"), 1) => self.header.version = Some(token.raw().trim().to_string()),
            (Some("$DWGCODEPAGE"), 3) => {
                self.header.code_page = Some(token.raw().trim().to_string())
            }
            _ => {}
        }
    }

    fn read_table_token(&mut self, token: Token) -> Result<Option<EntityRecord>, DxfError> {
        match token.marker() {
            Some("ENDSEC") => {
                self.section = Section::Outside;
                Ok(None)
            }
            Some("LAYER") => {
                let body = self.read_body()?;
                let source = SourceMarker {
                    entity_type: "LAYER".to_string(),
                    line: token.line,
                };
                match build_layer_def(&Fields::new(&body)) {
                    Some(layer) => Ok(Some(EntityRecord {
                        source,
                        body: RecordBody::LayerDef(layer),
                    })),
                    None => {
                        debug!(line = token.line, "LAYER 表项缺少名称，已忽略");
                        Ok(None)
                    }
                }
            }
            Some(_) => {
                // TABLE/ENDTAB 与其他表项
                self.read_body()?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn read_entity_token(&mut self, token: Token) -> Result<Option<EntityRecord>, DxfError> {
        let kind = match token.marker() {
            Some("ENDSEC") => {
                self.section = Section::Outside;
                return Ok(None);
            }
            Some("SEQEND") | Some("VERTEX") | Some("ATTRIB") => {
                self.read_body()?;
                return Ok(None);
            }
            Some(kind) => kind.to_string(),
            None => {
                debug!(line = token.line, code = token.code, "实体外的多余组码，已忽略");
                return Ok(None);
            }
        };

        let body = self.read_body()?;
        let fields = Fields::new(&body);
        let layer = fields.layer();
        let outcome = match kind.as_str() {
            "POLYLINE" => self.read_polyline(&fields)?,
            other => {
                if fields.entities_follow() {
                    self.skip_sequence()?;
                }
                build_entity(other, &fields, self.next_z)
            }
        };

        let body = match outcome {
            Ok(entity) => {
                self.next_z += 1;
                RecordBody::Entity(entity)
            }
            Err(reason) => RecordBody::Unsupported { layer, reason },
        };
        Ok(Some(EntityRecord {
            source: SourceMarker {
                entity_type: kind,
                line: token.line,
            },
            body,
        }))
    }

    /// 读取到下一个组码 0 之前的全部 token。
    fn read_body(&mut self) -> Result<Vec<Token>, DxfError> {
        let mut body = Vec::new();
        while let Some(token) = self.reader.next_token()? {
            if token.code == 0 {
                self.reader.put_back(token);
                break;
            }
            body.push(token);
        }
        Ok(body)
    }

    /// 跳过 ATTRIB/VERTEX 等附属实体直到 SEQEND。
    fn skip_sequence(&mut self) -> Result<(), DxfError> {
        while let Some(token) = self.reader.next_token()? {
            match token.marker() {
                Some("SEQEND") => {
                    self.read_body()?;
                    break;
                }
                Some("VERTEX") | Some("ATTRIB") => {
                    self.read_body()?;
                }
                _ => {
                    self.reader.put_back(token);
                    break;
                }
            }
        }
        Ok(())
    }

    /// 旧式 POLYLINE：头部之后跟随若干 VERTEX，以 SEQEND 结束。
    fn read_polyline(&mut self, fields: &Fields<'_>) -> Result<Result<Entity, SkipReason>, DxfError> {
        let mut vertices = Vec::new();
        let mut vertex_error: Option<SkipReason> = None;
        while let Some(token) = self.reader.next_token()? {
            match token.marker() {
                Some("VERTEX") => {
                    let body = self.read_body()?;
                    let vertex_fields = Fields::new(&body);
                    match read_polyline_vertex(&vertex_fields) {
                        Ok(Some(vertex)) => vertices.push(vertex),
                        Ok(None) => {}
                        Err(reason) => {
                            vertex_error.get_or_insert(reason);
                        }
                    }
                }
                Some("SEQEND") => {
                    self.read_body()?;
                    break;
                }
                _ => {
                    self.reader.put_back(token);
                    break;
                }
            }
        }

        Ok(build_polyline(fields, vertices, vertex_error, self.next_z))
    }
}

impl Iterator for EntityParser<'_> {
    type Item = Result<EntityRecord, DxfError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// 一个实体的全部字段，按组码查询。
struct Fields<'t> {
    tokens: &'t [Token],
}

impl<'t> Fields<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens }
    }

    fn find(&self, code: i32) -> Result<Option<&'t Token>, SkipReason> {
        let mut matches = self.tokens.iter().filter(|token| token.code == code);
        let first = matches.next();
        if first.is_some() && matches.next().is_some() {
            return Err(SkipReason::DuplicateField { code });
        }
        Ok(first)
    }

    fn real(&self, code: i32) -> Result<Option<f64>, SkipReason> {
        match self.find(code)? {
            Some(token) => token
                .as_f64()
                .map(Some)
                .ok_or_else(|| SkipReason::InvalidValue {
                    code,
                    raw: token.raw(),
                }),
            None => Ok(None),
        }
    }

    fn required_real(&self, code: i32, field: &'static str) -> Result<f64, SkipReason> {
        self.real(code)?
            .ok_or(SkipReason::MissingField { field, code })
    }

    fn integer(&self, code: i32) -> Result<Option<i64>, SkipReason> {
        match self.find(code)? {
            Some(token) => token
                .as_i64()
                .map(Some)
                .ok_or_else(|| SkipReason::InvalidValue {
                    code,
                    raw: token.raw(),
                }),
            None => Ok(None),
        }
    }

    /// 组码 `x_code` 与 `x_code + 10` 组成的坐标对。
    fn point(&self, x_code: i32, field: &'static str) -> Result<Point2, SkipReason> {
        let x = self.required_real(x_code, field)?;
        let y = self.required_real(x_code + 10, field)?;
        Ok(Point2::new(x, y))
    }

    fn first_text(&self, code: i32) -> Option<&'t str> {
        self.tokens
            .iter()
            .find(|token| token.code == code)
            .and_then(Token::as_text)
    }

    fn layer(&self) -> Option<String> {
        self.first_text(8)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }

    fn entities_follow(&self) -> bool {
        self.tokens
            .iter()
            .any(|token| token.code == 66 && token.as_i64() == Some(1))
    }

    fn color(&self) -> Result<Color, SkipReason> {
        if let Some(true_color) = self.integer(420)? {
            return Ok(Color::from_true_color(true_color));
        }
        match self.integer(62)? {
            Some(index) => Ok(Color::from_index(clamp_i16(index))),
            None => Ok(Color::ByLayer),
        }
    }

    fn line_weight(&self) -> Result<LineWeight, SkipReason> {
        Ok(self
            .integer(370)?
            .map(|value| LineWeight::from_value(clamp_i16(value)))
            .unwrap_or(LineWeight::ByLayer))
    }

    fn appearance(&self, z_position: u32) -> Result<Appearance, SkipReason> {
        Ok(Appearance {
            color: self.color()?,
            line_weight: self.line_weight()?,
            z_position,
        })
    }
}

fn clamp_i16(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

fn layer_or_empty(fields: &Fields<'_>) -> String {
    fields.layer().unwrap_or_default()
}

fn build_entity(kind: &str, fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    match kind {
        "POINT" => build_point(fields, z),
        "LINE" => build_line(fields, z),
        "LWPOLYLINE" => build_lwpolyline(fields, z),
        "CIRCLE" => build_circle(fields, z),
        "ARC" => build_arc(fields, z),
        "ELLIPSE" => build_ellipse(fields, z),
        "SOLID" => build_solid(fields, z),
        "TEXT" => build_text(fields, z),
        "MTEXT" => build_mtext(fields, z),
        _ => Err(SkipReason::UnknownType),
    }
}

fn build_point(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let position = fields.point(10, "点坐标")?;
    Ok(Entity::Point(Point {
        position,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_line(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let start = fields.point(10, "LINE 起点")?;
    let end = fields.point(11, "LINE 终点")?;
    Ok(Entity::Line(Line {
        start,
        end,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_lwpolyline(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let flags = fields.integer(70)?.unwrap_or(0);
    let mut vertices: Vec<PolylineVertex> = Vec::new();
    let mut pending_x: Option<f64> = None;
    for token in fields.tokens {
        match token.code {
            10 => {
                let x = vertex_value(token)?;
                if pending_x.replace(x).is_some() {
                    return Err(SkipReason::MissingField {
                        field: "LWPOLYLINE 顶点 Y",
                        code: 20,
                    });
                }
            }
            20 => {
                let y = vertex_value(token)?;
                let x = pending_x.take().ok_or(SkipReason::MissingField {
                    field: "LWPOLYLINE 顶点 X",
                    code: 10,
                })?;
                vertices.push(PolylineVertex::new(Point2::new(x, y)));
            }
            42 => {
                let bulge = vertex_value(token)?;
                match vertices.last_mut() {
                    Some(vertex) => vertex.bulge = bulge,
                    None => return Err(SkipReason::Degenerate("LWPOLYLINE 在首个顶点前出现 bulge")),
                }
            }
            _ => {}
        }
    }
    if pending_x.is_some() {
        return Err(SkipReason::MissingField {
            field: "LWPOLYLINE 顶点 Y",
            code: 20,
        });
    }
    let appearance = fields.appearance(z)?;
    finish_polyline(vertices, flags & 0x01 != 0, fields.layer(), appearance)
}

fn vertex_value(token: &Token) -> Result<f64, SkipReason> {
    token.as_f64().ok_or_else(|| SkipReason::InvalidValue {
        code: token.code,
        raw: token.raw(),
    })
}

/// 读取一个 VERTEX；样条拟合控制点与多面网格面记录返回 `None`。
fn read_polyline_vertex(fields: &Fields<'_>) -> Result<Option<PolylineVertex>, SkipReason> {
    let flags = fields.integer(70)?.unwrap_or(0);
    if flags & 0x10 != 0 || (flags & 0x80 != 0 && flags & 0x40 == 0) {
        return Ok(None);
    }
    let position = fields.point(10, "VERTEX 坐标")?;
    let bulge = fields.real(42)?.unwrap_or(0.0);
    Ok(Some(PolylineVertex::with_bulge(position, bulge)))
}

fn finish_polyline(
    vertices: Vec<PolylineVertex>,
    is_closed: bool,
    layer: Option<String>,
    appearance: Appearance,
) -> Result<Entity, SkipReason> {
    if vertices.len() < 2 {
        return Err(SkipReason::Degenerate("多段线至少需要两个顶点"));
    }
    Ok(Entity::Polyline(Polyline {
        vertices,
        is_closed,
        layer: layer.unwrap_or_default(),
        appearance,
    }))
}

fn build_polyline(
    fields: &Fields<'_>,
    vertices: Vec<PolylineVertex>,
    vertex_error: Option<SkipReason>,
    z: u32,
) -> Result<Entity, SkipReason> {
    let flags = fields.integer(70)?.unwrap_or(0);
    if flags & 0x40 != 0 {
        return Err(SkipReason::Excluded("多面网格 POLYLINE 不在导入范围内"));
    }
    if flags & 0x10 != 0 {
        return Err(SkipReason::Excluded("三维网格 POLYLINE 不在导入范围内"));
    }
    if let Some(reason) = vertex_error {
        return Err(reason);
    }
    let appearance = fields.appearance(z)?;
    finish_polyline(vertices, flags & 0x01 != 0, fields.layer(), appearance)
}

fn positive_radius(fields: &Fields<'_>) -> Result<f64, SkipReason> {
    let radius = fields.required_real(40, "半径")?;
    if radius <= 0.0 {
        return Err(SkipReason::Degenerate("半径必须为正数"));
    }
    Ok(radius)
}

fn build_circle(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let center = fields.point(10, "CIRCLE 圆心")?;
    let radius = positive_radius(fields)?;
    Ok(Entity::Circle(Circle {
        center,
        radius,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_arc(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let center = fields.point(10, "ARC 圆心")?;
    let radius = positive_radius(fields)?;
    let start_angle = fields.required_real(50, "ARC 起始角")?.to_radians();
    let end_angle = fields.required_real(51, "ARC 终止角")?.to_radians();
    Ok(Entity::Arc(Arc {
        center,
        radius,
        start_angle,
        end_angle,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_ellipse(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let center = fields.point(10, "ELLIPSE 圆心")?;
    let major = fields.point(11, "ELLIPSE 主轴向量")?;
    if major.x().abs() < f64::EPSILON && major.y().abs() < f64::EPSILON {
        return Err(SkipReason::Degenerate("ELLIPSE 主轴向量长度为 0"));
    }
    let ratio = fields.real(40)?.unwrap_or(1.0);
    if ratio <= 0.0 {
        return Err(SkipReason::Degenerate("ELLIPSE 半径比必须为正数"));
    }
    let start_parameter = fields.real(41)?.unwrap_or(0.0);
    let end_parameter = fields.real(42)?.unwrap_or(TAU);
    // 参数只在一圈之内有意义；整圈写作 0..2π
    let full_turn = (end_parameter - start_parameter).abs() >= TAU;
    let start_parameter = start_parameter.rem_euclid(TAU);
    let end_parameter = if full_turn {
        start_parameter + TAU
    } else {
        end_parameter.rem_euclid(TAU)
    };
    Ok(Entity::Ellipse(Ellipse {
        center,
        major_axis: Vector2::new(major.x(), major.y()),
        ratio,
        start_parameter,
        end_parameter,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_solid(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let first_corner = fields.point(10, "SOLID 第一角点")?;
    let second_corner = fields.point(11, "SOLID 第二角点")?;
    let third_corner = fields.point(12, "SOLID 第三角点")?;
    let fourth_corner = match (fields.real(13)?, fields.real(23)?) {
        (None, None) => third_corner,
        _ => fields.point(13, "SOLID 第四角点")?,
    };
    Ok(Entity::Solid(Solid {
        first_corner,
        second_corner,
        third_corner,
        fourth_corner,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_text(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let insert = fields.point(10, "TEXT 插入点")?;
    let height = fields.required_real(40, "TEXT 文字高度")?;
    let content = fields.first_text(1).ok_or(SkipReason::MissingField {
        field: "TEXT 文本内容",
        code: 1,
    })?;
    let rotation = fields.real(50)?.unwrap_or(0.0).to_radians();
    let alignment = TextAlignment::from_horizontal_code(fields.integer(72)?.unwrap_or(0));
    Ok(Entity::Text(Text {
        insert,
        content: decode_text_content(content),
        height,
        rotation,
        alignment,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_mtext(fields: &Fields<'_>, z: u32) -> Result<Entity, SkipReason> {
    let insert = fields.point(10, "MTEXT 插入点")?;
    let height = fields.required_real(40, "MTEXT 文字高度")?;

    // 长文本拆成若干组码 3，最后一段为组码 1
    let mut raw = String::new();
    for token in fields.tokens.iter().filter(|token| token.code == 3) {
        raw.push_str(token.as_text().unwrap_or_default());
    }
    let last = fields.first_text(1).ok_or(SkipReason::MissingField {
        field: "MTEXT 文本内容",
        code: 1,
    })?;
    raw.push_str(last);

    let rotation = match (fields.real(11)?, fields.real(21)?) {
        (Some(dx), Some(dy)) if dx != 0.0 || dy != 0.0 => dy.atan2(dx),
        _ => fields.real(50)?.unwrap_or(0.0).to_radians(),
    };
    // 附着点 1..9 按列取水平对齐
    let alignment = match fields.integer(71)?.unwrap_or(1) {
        2 | 5 | 8 => TextAlignment::Center,
        3 | 6 | 9 => TextAlignment::Right,
        _ => TextAlignment::Left,
    };
    Ok(Entity::Text(Text {
        insert,
        content: decode_mtext_content(&raw),
        height,
        rotation,
        alignment,
        layer: layer_or_empty(fields),
        appearance: fields.appearance(z)?,
    }))
}

fn build_layer_def(fields: &Fields<'_>) -> Option<LayerDef> {
    let name = fields.first_text(2)?.trim();
    if name.is_empty() {
        return None;
    }
    let raw_color = fields.integer(62).ok().flatten().unwrap_or(7);
    let color = match fields.integer(420).ok().flatten() {
        Some(true_color) => Color::from_true_color(true_color),
        None => Color::from_index(clamp_i16(raw_color)),
    };
    let line_weight = fields
        .integer(370)
        .ok()
        .flatten()
        .map(|value| LineWeight::from_value(clamp_i16(value)))
        .unwrap_or(LineWeight::Default);
    let flags = fields.integer(70).ok().flatten().unwrap_or(0);
    Some(LayerDef {
        name: name.to_string(),
        color,
        line_weight,
        is_off: raw_color < 0,
        is_frozen: flags & 0x01 != 0,
    })
}
