use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use crate::app::{HandlerTransfer, PointI, Vec2, ViewportSize};

use super::error::{ContentError, ContentErrorCode};
use super::xml::{child, children, parse_document, read_source, XmlFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauseScreenDef {
    pub sound: Option<String>,
    pub weapons: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeterOrientation {
    #[default]
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealthMeterDef {
    pub position: Vec2,
    /// Image for one tick; drawn once per filled tick.
    pub image: String,
    pub background: Option<String>,
    pub orientation: MeterOrientation,
    /// Where the first tick sits relative to `position`.
    pub tick_offset: PointI,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDef {
    pub name: String,
    /// Resolved against the project file's directory.
    pub map: PathBuf,
    pub win: Option<HandlerTransfer>,
    pub lose: Option<HandlerTransfer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDef {
    pub name: String,
    pub base_dir: PathBuf,
    pub size: ViewportSize,
    pub pause_screen: Option<PauseScreenDef>,
    pub health_meter: Option<HealthMeterDef>,
    pub stages: Vec<StageDef>,
}

impl ProjectDef {
    pub fn stage(&self, name: &str) -> Option<&StageDef> {
        self.stages.iter().find(|stage| stage.name == name)
    }
}

pub fn load_project(path: &Path) -> Result<ProjectDef, ContentError> {
    let raw = read_source(path)?;
    parse_project(&raw, path)
}

/// Parses project XML; `path` is used for error reports and to resolve stage maps.
pub fn parse_project(raw: &str, path: &Path) -> Result<ProjectDef, ContentError> {
    let doc = parse_document(raw, path)?;
    let file = XmlFile::new(&doc, path);
    let root = file.root_named("Game")?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let size = match child(root, "Size") {
        Some(node) => ViewportSize {
            pixels_across: file.required_parse(node, "x", "an integer")?,
            pixels_down: file.required_parse(node, "y", "an integer")?,
        },
        None => ViewportSize::default(),
    };

    let pause_screen = child(root, "PauseScreen")
        .map(|node| parse_pause_screen(&file, node))
        .transpose()?;
    let health_meter = child(root, "HealthMeter")
        .map(|node| parse_health_meter(&file, node))
        .transpose()?;

    let mut stages = Vec::new();
    let mut seen = BTreeSet::new();
    if let Some(list) = child(root, "Stages") {
        for node in children(list, "Stage") {
            let stage = parse_stage(&file, node, &base_dir)?;
            if !seen.insert(stage.name.clone()) {
                return Err(file.error(
                    ContentErrorCode::DuplicateName,
                    format!("stage '{}' is declared more than once", stage.name),
                    node,
                ));
            }
            stages.push(stage);
        }
    }

    Ok(ProjectDef {
        name: root.attribute("name").unwrap_or_default().to_string(),
        base_dir,
        size,
        pause_screen,
        health_meter,
        stages,
    })
}

fn parse_pause_screen<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
) -> Result<PauseScreenDef, ContentError> {
    let weapons = children(node, "Weapon")
        .map(|weapon| file.required_attr(weapon, "name").map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PauseScreenDef {
        sound: node.attribute("sound").map(str::to_string),
        weapons,
    })
}

fn parse_health_meter<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
) -> Result<HealthMeterDef, ContentError> {
    let x: f32 = file.required_parse(node, "x", "a number")?;
    let y: f32 = file.required_parse(node, "y", "a number")?;
    let image = file.required_attr(node, "image")?.to_string();
    let orientation = match node.attribute("orientation") {
        Some("horizontal") => MeterOrientation::Horizontal,
        _ => MeterOrientation::Vertical,
    };
    let tick_x = file.parse_attr(node, "tickX", "an integer")?.unwrap_or(0);
    let tick_y = file.parse_attr(node, "tickY", "an integer")?.unwrap_or(0);

    Ok(HealthMeterDef {
        position: Vec2::new(x, y),
        image,
        background: node.attribute("background").map(str::to_string),
        orientation,
        tick_offset: PointI::new(tick_x, tick_y),
    })
}

fn parse_stage<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
    base_dir: &Path,
) -> Result<StageDef, ContentError> {
    let name = file.required_attr(node, "name")?.to_string();
    let map = base_dir.join(file.required_attr(node, "map")?);
    Ok(StageDef {
        name,
        map,
        win: parse_transfer(file, node, "win")?,
        lose: parse_transfer(file, node, "lose")?,
    })
}

fn parse_transfer<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
    attr: &str,
) -> Result<Option<HandlerTransfer>, ContentError> {
    let Some(raw) = node.attribute(attr) else {
        return Ok(None);
    };
    HandlerTransfer::parse(raw).map(Some).ok_or_else(|| {
        file.error(
            ContentErrorCode::InvalidValue,
            format!(
                "attribute '{attr}' on <Stage> must be 'stageselect', 'credits' or 'stage:<name>', got '{raw}'"
            ),
            node,
        )
    })
}
