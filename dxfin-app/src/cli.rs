use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use dxfin_config::ImportDefaults;
use dxfin_core::settings::{ImportSettings, LengthUnit, PlacementMode, UnitSelection};

#[derive(Parser, Debug)]
#[command(name = "dxfin", version, about = "Import a DXF drawing into a layered drawing model")]
pub struct Cli {
    #[arg(help = "DXF file to import")]
    pub file: PathBuf,
    #[arg(long, short, help = "Name of the resulting drawing")]
    pub name: Option<String>,
    #[arg(long, short, help = "auto, meter, decimeter, centimeter or millimeter")]
    pub unit: Option<UnitSelection>,
    #[arg(long, help = "Base unit of the host model")]
    pub host_unit: Option<LengthUnit>,
    #[arg(long, conflicts_with = "origin", help = "Move the drawing center to the origin")]
    pub center: bool,
    #[arg(
        long,
        value_name = "X,Y",
        allow_hyphen_values = true,
        help = "Move the drawing center to this point"
    )]
    pub origin: Option<Origin>,
    #[arg(long, conflicts_with = "no_text", help = "Import TEXT/MTEXT entities")]
    pub text: bool,
    #[arg(long, help = "Drop TEXT/MTEXT entities")]
    pub no_text: bool,
    #[arg(long, help = "Shrink text taller than 15 units to a tenth")]
    pub fix_fonts: bool,
    #[arg(long, value_name = "PATH", help = "Configuration file")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Output machine-readable JSON")]
    pub json: bool,
}

impl Cli {
    /// 在配置默认值之上叠加命令行参数。
    pub fn settings(&self, defaults: &ImportDefaults) -> ImportSettings {
        let mut settings = defaults.settings_for(&self.file);
        if let Some(name) = &self.name {
            settings.drawing_name = name.clone();
        }
        if let Some(unit) = self.unit {
            settings.unit = unit;
        }
        if let Some(host_unit) = self.host_unit {
            settings.host_unit = host_unit;
        }
        if let Some(origin) = self.origin {
            settings.placement = PlacementMode::CustomCenter {
                x: origin.x,
                y: origin.y,
            };
        } else if self.center {
            settings.placement = PlacementMode::CenterOfDrawing;
        }
        if self.text {
            settings.import_text = true;
        } else if self.no_text {
            settings.import_text = false;
        }
        if self.fix_fonts {
            settings.fix_font_heights = true;
        }
        settings
    }
}

/// `--origin` 的取值，格式为 `X,Y`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Origin {
    pub x: f64,
    pub y: f64,
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y but got \"{s}\""))?;
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("invalid coordinate \"{}\"", value.trim()))
        };
        Ok(Origin {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}
