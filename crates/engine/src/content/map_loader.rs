use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::Node;
use tracing::debug;

use crate::app::consts::DEFAULT_TILE_SIZE;
use crate::app::{PointI, RectF};

use super::error::{ContentError, ContentErrorCode};
use super::map::{
    EntityPlacement, Join, JoinDirection, JoinKind, Map, MusicTrack, Screen, TeleportInfo,
    TileDef, TileFrame, Tilemap, TilemapError, Tileset,
};
use super::xml::{child, children, parse_document, read_source, XmlFile};

pub fn load_map(path: &Path) -> Result<Map, ContentError> {
    let raw = read_source(path)?;
    parse_map(&raw, path)
}

pub fn parse_map(raw: &str, path: &Path) -> Result<Map, ContentError> {
    let doc = parse_document(raw, path)?;
    let file = XmlFile::new(&doc, path);
    let root = file.root_named("Map")?;
    let name = root
        .attribute("name")
        .map(str::to_string)
        .or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_default();

    let tileset = match child(root, "Tileset") {
        Some(node) => parse_tileset(&file, node)?,
        None => Tileset {
            tile_size: DEFAULT_TILE_SIZE,
            sheet: None,
            tiles: BTreeMap::new(),
        },
    };

    let mut screens = BTreeMap::new();
    for node in children(root, "Screen") {
        let screen = parse_screen(&file, node)?;
        if screens.contains_key(&screen.name) {
            return Err(file.error(
                ContentErrorCode::DuplicateName,
                format!("screen '{}' is declared more than once", screen.name),
                node,
            ));
        }
        screens.insert(screen.name.clone(), screen);
    }
    if screens.is_empty() {
        return Err(file.error(
            ContentErrorCode::MissingElement,
            format!("map '{name}' has no <Screen> elements"),
            root,
        ));
    }

    let start_node = file.required_child(root, "Start")?;
    let start_screen = start_node.attribute("screen").unwrap_or_default().to_string();
    if !start_screen.is_empty() && !screens.contains_key(&start_screen) {
        return Err(file.error(
            ContentErrorCode::MissingStartScreen,
            format!("map '{name}' has no screen named '{start_screen}' to start on"),
            start_node,
        ));
    }
    let start = parse_point(&file, start_node)?;

    let mut continue_points = BTreeMap::new();
    for node in children(root, "Continue") {
        let screen = require_screen(&file, node, "screen", &screens)?;
        continue_points.insert(screen, parse_point(&file, node)?);
    }

    for node in children(root, "Screen") {
        for teleport in children(node, "Teleport") {
            require_screen(&file, teleport, "to", &screens)?;
        }
    }

    let mut joins = Vec::new();
    for node in children(root, "Join") {
        joins.push(parse_join(&file, node, &screens)?);
    }

    let (music, nsf_track) = match child(root, "Music") {
        Some(node) => parse_music(&file, node)?,
        None => (None, None),
    };

    debug!(
        map = %name,
        screens = screens.len(),
        joins = joins.len(),
        "map_parsed"
    );
    Ok(Map {
        name,
        screens,
        start_screen,
        start,
        continue_points,
        tileset,
        music,
        nsf_track,
        joins,
    })
}

fn parse_point<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
) -> Result<PointI, ContentError> {
    Ok(PointI::new(
        file.required_parse(node, "x", "an integer")?,
        file.required_parse(node, "y", "an integer")?,
    ))
}

fn unknown_screen(file: &XmlFile<'_, '_>, node: Node<'_, '_>, screen: &str) -> ContentError {
    file.error(
        ContentErrorCode::UnknownScreen,
        format!(
            "<{}> refers to unknown screen '{screen}'",
            node.tag_name().name()
        ),
        node,
    )
}

fn require_screen<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
    attr: &str,
    screens: &BTreeMap<String, Screen>,
) -> Result<String, ContentError> {
    let screen = file.required_attr(node, attr)?;
    if !screens.contains_key(screen) {
        return Err(unknown_screen(file, node, screen));
    }
    Ok(screen.to_string())
}

/// Maps a lowercase keyword attribute onto one of `options`; absent uses `default`.
fn parse_keyword<'input, T: Copy>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
    attr: &str,
    options: &[(&str, T)],
    default: Option<T>,
) -> Result<T, ContentError> {
    let Some(raw) = node.attribute(attr) else {
        return default.ok_or_else(|| {
            file.error(
                ContentErrorCode::MissingAttribute,
                format!(
                    "<{}> is missing required attribute '{attr}'",
                    node.tag_name().name()
                ),
                node,
            )
        });
    };
    let wanted = raw.trim().to_ascii_lowercase();
    options
        .iter()
        .find(|(keyword, _)| *keyword == wanted)
        .map(|(_, value)| *value)
        .ok_or_else(|| {
            let allowed = options
                .iter()
                .map(|(keyword, _)| *keyword)
                .collect::<Vec<_>>()
                .join("|");
            file.error(
                ContentErrorCode::InvalidValue,
                format!(
                    "attribute '{attr}' on <{}> must be one of {allowed}, got '{raw}'",
                    node.tag_name().name()
                ),
                node,
            )
        })
}

fn parse_music<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
) -> Result<(Option<MusicTrack>, Option<u32>), ContentError> {
    let track = MusicTrack {
        intro: node.attribute("intro").map(str::to_string),
        looped: node.attribute("loop").map(str::to_string),
    };
    let nsf = file
        .parse_attr::<u32>(node, "nsftrack", "a track number")?
        .filter(|track| *track > 0);
    Ok(((!track.is_empty()).then_some(track), nsf))
}

fn parse_tileset<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
) -> Result<Tileset, ContentError> {
    let tile_size = file
        .parse_attr(node, "tilesize", "a pixel size")?
        .unwrap_or(DEFAULT_TILE_SIZE);
    if tile_size == 0 {
        return Err(file.error(
            ContentErrorCode::InvalidValue,
            "attribute 'tilesize' on <Tileset> must be greater than zero".to_string(),
            node,
        ));
    }

    let mut tiles = BTreeMap::new();
    for tile_node in children(node, "Tile") {
        let id: u16 = file.required_parse(tile_node, "id", "a tile id")?;
        let mut frames = children(tile_node, "Frame")
            .map(|frame| -> Result<TileFrame, ContentError> {
                Ok(TileFrame {
                    cell: file.required_parse(frame, "cell", "a sheet cell index")?,
                    duration: file
                        .parse_attr(frame, "duration", "a frame count")?
                        .unwrap_or(0),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if frames.is_empty() {
            frames.push(TileFrame {
                cell: u32::from(id),
                duration: 0,
            });
        }
        let def = TileDef {
            id,
            name: tile_node.attribute("name").unwrap_or_default().to_string(),
            frames,
        };
        if tiles.insert(id, def).is_some() {
            return Err(file.error(
                ContentErrorCode::DuplicateName,
                format!("tile id {id} is declared more than once"),
                tile_node,
            ));
        }
    }

    Ok(Tileset {
        tile_size,
        sheet: node.attribute("sheet").map(str::to_string),
        tiles,
    })
}

fn parse_screen<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
) -> Result<Screen, ContentError> {
    let name = file.required_attr(node, "name")?.to_string();
    let width: u32 = file.required_parse(node, "width", "a tile count")?;
    let height: u32 = file.required_parse(node, "height", "a tile count")?;

    let tiles_node = file.required_child(node, "Tiles")?;
    let ids = tiles_node
        .text()
        .unwrap_or_default()
        .split_whitespace()
        .map(|raw| {
            raw.parse::<u16>().map_err(|_| {
                file.error(
                    ContentErrorCode::InvalidValue,
                    format!("screen '{name}' has non-numeric tile id '{raw}'"),
                    tiles_node,
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let tiles = Tilemap::new(width, height, ids).map_err(|error| {
        let TilemapError::TileCountMismatch { expected, actual } = error;
        file.error(
            ContentErrorCode::TileCountMismatch,
            format!("screen '{name}' is {width}x{height} ({expected} tiles) but lists {actual}"),
            tiles_node,
        )
    })?;

    let teleports = children(node, "Teleport")
        .map(|teleport| -> Result<TeleportInfo, ContentError> {
            Ok(TeleportInfo {
                source: RectF::new(
                    file.required_parse(teleport, "x", "a number")?,
                    file.required_parse(teleport, "y", "a number")?,
                    file.required_parse(teleport, "width", "a number")?,
                    file.required_parse(teleport, "height", "a number")?,
                ),
                target_screen: file.required_attr(teleport, "to")?.to_string(),
                target: PointI::new(
                    file.required_parse(teleport, "tox", "an integer")?,
                    file.required_parse(teleport, "toy", "an integer")?,
                ),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut entities = Vec::new();
    for placement in node.children().filter(|n| n.is_element()) {
        let boss = match placement.tag_name().name() {
            "Entity" => false,
            "Boss" => true,
            _ => continue,
        };
        entities.push(EntityPlacement {
            name: file.required_attr(placement, "name")?.to_string(),
            position: parse_point(file, placement)?,
            boss,
        });
    }

    let (music, nsf_track) = match child(node, "Music") {
        Some(music) => parse_music(file, music)?,
        None => (None, None),
    };

    Ok(Screen {
        name,
        tiles,
        teleports,
        entities,
        music,
        nsf_track,
    })
}

fn parse_join<'input>(
    file: &XmlFile<'_, 'input>,
    node: Node<'_, 'input>,
    screens: &BTreeMap<String, Screen>,
) -> Result<Join, ContentError> {
    let kind = parse_keyword(
        file,
        node,
        "type",
        &[("vertical", JoinKind::Vertical), ("horizontal", JoinKind::Horizontal)],
        None,
    )?;
    let direction = parse_keyword(
        file,
        node,
        "direction",
        &[
            ("both", JoinDirection::Both),
            ("forward", JoinDirection::ForwardOnly),
            ("backward", JoinDirection::BackwardOnly),
        ],
        Some(JoinDirection::Both),
    )?;
    let size: i32 = file.required_parse(node, "size", "a tile count")?;
    if size <= 0 {
        return Err(file.error(
            ContentErrorCode::InvalidValue,
            format!("attribute 'size' on <Join> must be positive, got {size}"),
            node,
        ));
    }

    Ok(Join {
        kind,
        screen_one: require_screen(file, node, "s1", screens)?,
        screen_two: require_screen(file, node, "s2", screens)?,
        offset_one: file.parse_attr(node, "offset1", "an integer")?.unwrap_or(0),
        offset_two: file.parse_attr(node, "offset2", "an integer")?.unwrap_or(0),
        size,
        direction,
    })
}
