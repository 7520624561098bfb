//! Uniform parse/serialize wrappers over the economy file formats.

pub mod xml;

use serde::Serialize;
use thiserror::Error;

use crate::model::{
    AmmoDump, AttachmentCandidate, AttachmentGroup, ClothingDump, HardlineFile, ItemDump, MagDump,
    SpawnableEntry, TraderFile, TypeEntry, TypeFlags, WeaponDump,
};
use xml::XmlElement;

/// Errors produced by the file model layer.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("invalid xml: {0}")]
    Xml(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected <{expected}> document, found <{found}>")]
    UnexpectedRoot { expected: &'static str, found: String },
}

/// Which backend root a file lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileLocation {
    Mission,
    Profile,
}

/// Wire format of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Xml,
    Json,
}

/// The file kinds the editor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Types,
    SpawnableTypes,
    EconomyCore,
    Limits,
    Trader,
    Hardline,
    WeaponDump,
    AmmoDump,
    MagDump,
    ClothingDump,
    ItemDump,
}

impl FileKind {
    /// Root the file is fetched from and written back to.
    pub fn location(&self) -> FileLocation {
        match self {
            FileKind::Types
            | FileKind::SpawnableTypes
            | FileKind::EconomyCore
            | FileKind::Limits
            | FileKind::Hardline => FileLocation::Mission,
            FileKind::Trader
            | FileKind::WeaponDump
            | FileKind::AmmoDump
            | FileKind::MagDump
            | FileKind::ClothingDump
            | FileKind::ItemDump => FileLocation::Profile,
        }
    }

    /// Wire format for this kind.
    pub fn content_type(&self) -> ContentType {
        match self {
            FileKind::Types
            | FileKind::SpawnableTypes
            | FileKind::EconomyCore
            | FileKind::Limits => ContentType::Xml,
            _ => ContentType::Json,
        }
    }

    /// Reference files are excluded from the save sequence even when their
    /// in-memory content was touched.
    pub fn skip_save(&self) -> bool {
        matches!(
            self,
            FileKind::SpawnableTypes
                | FileKind::Limits
                | FileKind::WeaponDump
                | FileKind::AmmoDump
                | FileKind::MagDump
                | FileKind::ClothingDump
                | FileKind::ItemDump
        )
    }
}

/// Parsed content of a file, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    /// Nothing parsed yet, or the fetch failed and the file is treated as
    /// empty.
    Empty,
    Types(Vec<TypeEntry>),
    Spawnable(Vec<SpawnableEntry>),
    /// Economy-core and limits documents are kept as a raw tree.
    Tree(XmlElement),
    Trader(TraderFile),
    Hardline(HardlineFile),
    Weapons(Vec<WeaponDump>),
    Ammo(Vec<AmmoDump>),
    Mags(Vec<MagDump>),
    Clothing(Vec<ClothingDump>),
    Items(Vec<ItemDump>),
}

/// The persistence unit: one economy file with its parsed content.
#[derive(Debug, Clone, PartialEq)]
pub struct FileWrapper {
    /// Path relative to the location root.
    pub path: String,
    pub kind: FileKind,
    /// Trader files carry a short display name derived from the file stem.
    pub shortname: Option<String>,
    pub content: FileContent,
}

impl FileWrapper {
    /// New wrapper with empty content.
    pub fn new(kind: FileKind, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            shortname: None,
            content: FileContent::Empty,
        }
    }

    /// New trader wrapper for a market file; the shortname is the file
    /// stem.
    pub fn market(path: impl Into<String>) -> Self {
        let path = path.into();
        let stem = path
            .rsplit('/')
            .next()
            .map(|name| name.trim_end_matches(".json").to_string());
        Self {
            path,
            kind: FileKind::Trader,
            shortname: stem,
            content: FileContent::Empty,
        }
    }

    pub fn location(&self) -> FileLocation {
        self.kind.location()
    }

    pub fn content_type(&self) -> ContentType {
        self.kind.content_type()
    }

    pub fn skip_save(&self) -> bool {
        self.kind.skip_save()
    }

    /// Replace the content with the empty value for this kind, used when a
    /// fetch or parse fails so the remaining files still load.
    pub fn clear(&mut self) {
        self.content = match self.kind {
            FileKind::Types => FileContent::Types(Vec::new()),
            FileKind::SpawnableTypes => FileContent::Spawnable(Vec::new()),
            FileKind::Trader => FileContent::Trader(TraderFile::default()),
            FileKind::Hardline => FileContent::Hardline(HardlineFile::default()),
            FileKind::WeaponDump => FileContent::Weapons(Vec::new()),
            FileKind::AmmoDump => FileContent::Ammo(Vec::new()),
            FileKind::MagDump => FileContent::Mags(Vec::new()),
            FileKind::ClothingDump => FileContent::Clothing(Vec::new()),
            FileKind::ItemDump => FileContent::Items(Vec::new()),
            FileKind::EconomyCore | FileKind::Limits => FileContent::Empty,
        };
    }

    /// Parse raw text into this wrapper's content.
    pub fn parse(&mut self, text: &str) -> Result<(), FileError> {
        self.content = match self.kind {
            FileKind::Types => FileContent::Types(parse_types(text)?),
            FileKind::SpawnableTypes => FileContent::Spawnable(parse_spawnable(text)?),
            FileKind::EconomyCore => FileContent::Tree(expect_root(text, "economycore")?),
            FileKind::Limits => FileContent::Tree(expect_root(text, "lists")?),
            FileKind::Trader => FileContent::Trader(serde_json::from_str(text)?),
            FileKind::Hardline => FileContent::Hardline(serde_json::from_str(text)?),
            FileKind::WeaponDump => FileContent::Weapons(serde_json::from_str(text)?),
            FileKind::AmmoDump => FileContent::Ammo(serde_json::from_str(text)?),
            FileKind::MagDump => FileContent::Mags(serde_json::from_str(text)?),
            FileKind::ClothingDump => FileContent::Clothing(serde_json::from_str(text)?),
            FileKind::ItemDump => FileContent::Items(serde_json::from_str(text)?),
        };
        Ok(())
    }

    /// Serialize the content back to text, the inverse of [`Self::parse`].
    pub fn serialize(&self) -> Result<String, FileError> {
        Ok(match &self.content {
            FileContent::Empty => String::new(),
            FileContent::Types(entries) => serialize_types(entries),
            FileContent::Spawnable(entries) => serialize_spawnable(entries),
            FileContent::Tree(tree) => tree.serialize(),
            FileContent::Trader(file) => to_pretty_json(file)?,
            FileContent::Hardline(file) => to_pretty_json(file)?,
            FileContent::Weapons(list) => to_pretty_json(list)?,
            FileContent::Ammo(list) => to_pretty_json(list)?,
            FileContent::Mags(list) => to_pretty_json(list)?,
            FileContent::Clothing(list) => to_pretty_json(list)?,
            FileContent::Items(list) => to_pretty_json(list)?,
        })
    }

    /// Parsed type entries, when this is a types file.
    pub fn types(&self) -> Option<&[TypeEntry]> {
        match &self.content {
            FileContent::Types(entries) => Some(entries),
            _ => None,
        }
    }

    /// Mutable type entries, when this is a types file.
    pub fn types_mut(&mut self) -> Option<&mut Vec<TypeEntry>> {
        match &mut self.content {
            FileContent::Types(entries) => Some(entries),
            _ => None,
        }
    }

    /// Raw tree content, for economy-core and limits documents.
    pub fn tree(&self) -> Option<&XmlElement> {
        match &self.content {
            FileContent::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Trader content accessors.
    pub fn trader(&self) -> Option<&TraderFile> {
        match &self.content {
            FileContent::Trader(file) => Some(file),
            _ => None,
        }
    }

    pub fn trader_mut(&mut self) -> Option<&mut TraderFile> {
        match &mut self.content {
            FileContent::Trader(file) => Some(file),
            _ => None,
        }
    }

    /// Hardline content accessors.
    pub fn hardline(&self) -> Option<&HardlineFile> {
        match &self.content {
            FileContent::Hardline(file) => Some(file),
            _ => None,
        }
    }

    pub fn hardline_mut(&mut self) -> Option<&mut HardlineFile> {
        match &mut self.content {
            FileContent::Hardline(file) => Some(file),
            _ => None,
        }
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, FileError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn expect_root(text: &str, expected: &'static str) -> Result<XmlElement, FileError> {
    let root = XmlElement::parse(text)?;
    if root.name != expected {
        return Err(FileError::UnexpectedRoot {
            expected,
            found: root.name,
        });
    }
    Ok(root)
}

fn parse_types(text: &str) -> Result<Vec<TypeEntry>, FileError> {
    let root = expect_root(text, "types")?;
    Ok(root.children_named("type").map(type_from_xml).collect())
}

fn type_from_xml(element: &XmlElement) -> TypeEntry {
    let names = |tag: &str| -> Vec<String> {
        element
            .children_named(tag)
            .filter_map(|child| child.attr("name"))
            .map(str::to_string)
            .collect()
    };
    // Missing numeric fields get the documented editor defaults.
    let number = |tag: &str, default: i64| -> i64 {
        element
            .child_text(tag)
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(default)
    };

    let flags = element.child("flags").map(|flags| {
        let flag = |name: &str| flags.attr(name) == Some("1");
        TypeFlags {
            count_in_cargo: flag("count_in_cargo"),
            count_in_hoarder: flag("count_in_hoarder"),
            count_in_map: flag("count_in_map"),
            count_in_player: flag("count_in_player"),
            crafted: flag("crafted"),
            deloot: flag("deloot"),
        }
    });

    TypeEntry {
        name: element.attr("name").unwrap_or_default().to_string(),
        categories: names("category"),
        usages: names("usage"),
        values: names("value"),
        flags,
        nominal: number("nominal", 0),
        lifetime: element
            .child_text("lifetime")
            .and_then(|text| text.trim().parse().ok()),
        restock: number("restock", 1800),
        min: number("min", 0),
        quantmin: number("quantmin", -1),
        quantmax: number("quantmax", -1),
        cost: number("cost", 100),
    }
}

fn type_to_xml(entry: &TypeEntry) -> XmlElement {
    let mut element = XmlElement::new("type");
    element.set_attr("name", entry.name.clone());

    element
        .children
        .push(XmlElement::text_node("nominal", entry.nominal.to_string()));
    if let Some(lifetime) = entry.lifetime {
        element
            .children
            .push(XmlElement::text_node("lifetime", lifetime.to_string()));
    }
    element
        .children
        .push(XmlElement::text_node("restock", entry.restock.to_string()));
    element
        .children
        .push(XmlElement::text_node("min", entry.min.to_string()));
    element
        .children
        .push(XmlElement::text_node("quantmin", entry.quantmin.to_string()));
    element
        .children
        .push(XmlElement::text_node("quantmax", entry.quantmax.to_string()));
    element
        .children
        .push(XmlElement::text_node("cost", entry.cost.to_string()));

    if let Some(flags) = &entry.flags {
        let mut node = XmlElement::new("flags");
        let bit = |value: bool| if value { "1" } else { "0" };
        node.set_attr("count_in_cargo", bit(flags.count_in_cargo));
        node.set_attr("count_in_hoarder", bit(flags.count_in_hoarder));
        node.set_attr("count_in_map", bit(flags.count_in_map));
        node.set_attr("count_in_player", bit(flags.count_in_player));
        node.set_attr("crafted", bit(flags.crafted));
        node.set_attr("deloot", bit(flags.deloot));
        element.children.push(node);
    }

    for tag in &entry.categories {
        let mut node = XmlElement::new("category");
        node.set_attr("name", tag.clone());
        element.children.push(node);
    }
    for tag in &entry.usages {
        let mut node = XmlElement::new("usage");
        node.set_attr("name", tag.clone());
        element.children.push(node);
    }
    for tag in &entry.values {
        let mut node = XmlElement::new("value");
        node.set_attr("name", tag.clone());
        element.children.push(node);
    }

    element
}

fn serialize_types(entries: &[TypeEntry]) -> String {
    let mut root = XmlElement::new("types");
    root.children = entries.iter().map(type_to_xml).collect();
    root.serialize()
}

fn parse_spawnable(text: &str) -> Result<Vec<SpawnableEntry>, FileError> {
    let root = expect_root(text, "spawnabletypes")?;
    Ok(root
        .children_named("type")
        .map(|entry| SpawnableEntry {
            name: entry.attr("name").unwrap_or_default().to_string(),
            attachments: entry
                .children_named("attachments")
                .map(|group| AttachmentGroup {
                    chance: group
                        .attr("chance")
                        .and_then(|value| value.parse().ok())
                        .unwrap_or(0.0),
                    items: group
                        .children_named("item")
                        .map(|item| AttachmentCandidate {
                            name: item.attr("name").unwrap_or_default().to_string(),
                            chance: item
                                .attr("chance")
                                .and_then(|value| value.parse().ok())
                                .unwrap_or(0.0),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect())
}

fn serialize_spawnable(entries: &[SpawnableEntry]) -> String {
    let mut root = XmlElement::new("spawnabletypes");
    for entry in entries {
        let mut node = XmlElement::new("type");
        node.set_attr("name", entry.name.clone());
        for group in &entry.attachments {
            let mut group_node = XmlElement::new("attachments");
            group_node.set_attr("chance", format!("{:.2}", group.chance));
            for item in &group.items {
                let mut item_node = XmlElement::new("item");
                item_node.set_attr("name", item.name.clone());
                item_node.set_attr("chance", format!("{:.2}", item.chance));
                group_node.children.push(item_node);
            }
            node.children.push(group_node);
        }
        root.children.push(node);
    }
    root.serialize()
}
