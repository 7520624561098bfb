//! Case-insensitive classname resolution over the reference dumps.

use std::collections::HashMap;

use crate::files::{FileContent, FileWrapper};
use crate::model::{
    AmmoDump, ClothingDump, EntityKind, ItemDump, MagDump, SpawnableEntry, WeaponDump,
};

/// Reference to a dump record of any kind.
#[derive(Debug, Clone, Copy)]
pub enum DumpRef<'a> {
    Weapon(&'a WeaponDump),
    Ammo(&'a AmmoDump),
    Mag(&'a MagDump),
    Clothing(&'a ClothingDump),
    Item(&'a ItemDump),
}

impl<'a> DumpRef<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            DumpRef::Weapon(_) => EntityKind::Weapon,
            DumpRef::Ammo(_) => EntityKind::Ammo,
            DumpRef::Mag(_) => EntityKind::Mag,
            DumpRef::Clothing(_) => EntityKind::Clothing,
            DumpRef::Item(_) => EntityKind::Item,
        }
    }

    pub fn display_name(&self) -> &'a str {
        match self {
            DumpRef::Weapon(dump) => &dump.base.display_name,
            DumpRef::Ammo(dump) => &dump.display_name,
            DumpRef::Mag(dump) => &dump.display_name,
            DumpRef::Clothing(dump) => &dump.base.display_name,
            DumpRef::Item(dump) => &dump.base.display_name,
        }
    }

    pub fn parents(&self) -> &'a [String] {
        match self {
            DumpRef::Weapon(dump) => &dump.base.parents,
            DumpRef::Ammo(dump) => &dump.parents,
            DumpRef::Mag(dump) => &dump.parents,
            DumpRef::Clothing(dump) => &dump.base.parents,
            DumpRef::Item(dump) => &dump.base.parents,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            DumpRef::Weapon(dump) => dump.base.weight,
            DumpRef::Ammo(dump) => dump.weight,
            DumpRef::Mag(dump) => dump.weight,
            DumpRef::Clothing(dump) => dump.base.weight,
            DumpRef::Item(dump) => dump.base.weight,
        }
    }

    pub fn hit_points(&self) -> Option<f64> {
        match self {
            DumpRef::Weapon(dump) => Some(dump.base.hit_points),
            DumpRef::Clothing(dump) => Some(dump.base.hit_points),
            DumpRef::Item(dump) => Some(dump.base.hit_points),
            DumpRef::Ammo(_) | DumpRef::Mag(_) => None,
        }
    }

    pub fn loot_category(&self) -> Option<&'a str> {
        match self {
            DumpRef::Weapon(dump) => Some(&dump.base.loot_category),
            DumpRef::Clothing(dump) => Some(&dump.base.loot_category),
            DumpRef::Item(dump) => Some(&dump.base.loot_category),
            DumpRef::Ammo(_) | DumpRef::Mag(_) => None,
        }
    }

    pub fn loot_tag(&self) -> &'a [String] {
        match self {
            DumpRef::Weapon(dump) => &dump.base.loot_tag,
            DumpRef::Clothing(dump) => &dump.base.loot_tag,
            DumpRef::Item(dump) => &dump.base.loot_tag,
            DumpRef::Ammo(_) | DumpRef::Mag(_) => &[],
        }
    }

    pub fn item_info(&self) -> &'a [String] {
        match self {
            DumpRef::Weapon(dump) => &dump.base.item_info,
            DumpRef::Clothing(dump) => &dump.base.item_info,
            DumpRef::Item(dump) => &dump.base.item_info,
            DumpRef::Ammo(_) | DumpRef::Mag(_) => &[],
        }
    }
}

/// Lower-cased lookup tables over everything the loaded files know about a
/// classname. Rebuilt whenever files change; all queries are
/// case-insensitive because keys are normalized once here.
#[derive(Debug, Default)]
pub struct EntityIndex {
    weapons: Vec<WeaponDump>,
    ammo: Vec<AmmoDump>,
    mags: Vec<MagDump>,
    clothing: Vec<ClothingDump>,
    items: Vec<ItemDump>,
    spawnable: HashMap<String, SpawnableEntry>,
    by_name: HashMap<String, (EntityKind, usize)>,
}

impl EntityIndex {
    /// Build the index from loaded files. On duplicate classnames the kind
    /// precedence is weapon, ammo, mag, clothing, item.
    pub fn build(files: &[FileWrapper]) -> Self {
        let mut index = Self::default();
        for file in files {
            match &file.content {
                FileContent::Weapons(list) => index.weapons.extend(list.iter().cloned()),
                FileContent::Ammo(list) => index.ammo.extend(list.iter().cloned()),
                FileContent::Mags(list) => index.mags.extend(list.iter().cloned()),
                FileContent::Clothing(list) => index.clothing.extend(list.iter().cloned()),
                FileContent::Items(list) => index.items.extend(list.iter().cloned()),
                FileContent::Spawnable(list) => {
                    for entry in list {
                        index
                            .spawnable
                            .insert(entry.name.to_lowercase(), entry.clone());
                    }
                }
                _ => {}
            }
        }

        for (pos, dump) in index.weapons.iter().enumerate() {
            index
                .by_name
                .entry(dump.base.classname.to_lowercase())
                .or_insert((EntityKind::Weapon, pos));
        }
        for (pos, dump) in index.ammo.iter().enumerate() {
            index
                .by_name
                .entry(dump.classname.to_lowercase())
                .or_insert((EntityKind::Ammo, pos));
        }
        for (pos, dump) in index.mags.iter().enumerate() {
            index
                .by_name
                .entry(dump.classname.to_lowercase())
                .or_insert((EntityKind::Mag, pos));
        }
        for (pos, dump) in index.clothing.iter().enumerate() {
            index
                .by_name
                .entry(dump.base.classname.to_lowercase())
                .or_insert((EntityKind::Clothing, pos));
        }
        for (pos, dump) in index.items.iter().enumerate() {
            index
                .by_name
                .entry(dump.base.classname.to_lowercase())
                .or_insert((EntityKind::Item, pos));
        }
        index
    }

    /// Dump kind a classname resolved to, if any.
    pub fn kind(&self, classname: &str) -> Option<EntityKind> {
        self.by_name
            .get(&classname.to_lowercase())
            .map(|(kind, _)| *kind)
    }

    /// Dump record for a classname, of whatever kind it resolved to.
    pub fn entity(&self, classname: &str) -> Option<DumpRef<'_>> {
        let (kind, pos) = *self.by_name.get(&classname.to_lowercase())?;
        Some(match kind {
            EntityKind::Weapon => DumpRef::Weapon(&self.weapons[pos]),
            EntityKind::Ammo => DumpRef::Ammo(&self.ammo[pos]),
            EntityKind::Mag => DumpRef::Mag(&self.mags[pos]),
            EntityKind::Clothing => DumpRef::Clothing(&self.clothing[pos]),
            EntityKind::Item => DumpRef::Item(&self.items[pos]),
        })
    }

    pub fn weapon(&self, classname: &str) -> Option<&WeaponDump> {
        match self.entity(classname)? {
            DumpRef::Weapon(dump) => Some(dump),
            _ => None,
        }
    }

    pub fn ammo(&self, classname: &str) -> Option<&AmmoDump> {
        match self.entity(classname)? {
            DumpRef::Ammo(dump) => Some(dump),
            _ => None,
        }
    }

    pub fn mag(&self, classname: &str) -> Option<&MagDump> {
        match self.entity(classname)? {
            DumpRef::Mag(dump) => Some(dump),
            _ => None,
        }
    }

    pub fn clothing(&self, classname: &str) -> Option<&ClothingDump> {
        match self.entity(classname)? {
            DumpRef::Clothing(dump) => Some(dump),
            _ => None,
        }
    }

    pub fn item(&self, classname: &str) -> Option<&ItemDump> {
        match self.entity(classname)? {
            DumpRef::Item(dump) => Some(dump),
            _ => None,
        }
    }

    /// Spawnable-types entry for a classname.
    pub fn spawnable(&self, classname: &str) -> Option<&SpawnableEntry> {
        self.spawnable.get(&classname.to_lowercase())
    }

    /// True when the classname is the given ancestor or lists it among its
    /// dump parents, compared case-insensitively.
    pub fn is_kind_of(&self, classname: &str, ancestor: &str) -> bool {
        if classname.eq_ignore_ascii_case(ancestor) {
            return true;
        }
        self.entity(classname)
            .map(|entity| {
                entity
                    .parents()
                    .iter()
                    .any(|parent| parent.eq_ignore_ascii_case(ancestor))
            })
            .unwrap_or(false)
    }

    /// All clothing records, used for inventory-slot scans.
    pub fn clothing_records(&self) -> &[ClothingDump] {
        &self.clothing
    }

    /// All generic item records, used for inventory-slot scans.
    pub fn item_records(&self) -> &[ItemDump] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileKind;
    use crate::model::DumpBase;

    fn weapon(classname: &str) -> WeaponDump {
        WeaponDump {
            base: DumpBase {
                classname: classname.to_string(),
                parents: vec!["Rifle_Base".to_string(), "Weapon_Base".to_string()],
                ..DumpBase::default()
            },
            ..WeaponDump::default()
        }
    }

    fn index_with(content: FileContent, kind: FileKind) -> EntityIndex {
        let mut file = FileWrapper::new(kind, "dump.json");
        file.content = content;
        EntityIndex::build(std::slice::from_ref(&file))
    }

    #[test]
    fn lookup_ignores_classname_case() {
        let index = index_with(FileContent::Weapons(vec![weapon("AKM")]), FileKind::WeaponDump);
        assert_eq!(index.kind("akm"), Some(EntityKind::Weapon));
        assert_eq!(index.kind("AKM"), Some(EntityKind::Weapon));
        assert!(index.weapon("Akm").is_some());
        assert_eq!(index.kind("akms"), None);
    }

    #[test]
    fn is_kind_of_checks_self_and_parents() {
        let index = index_with(FileContent::Weapons(vec![weapon("AKM")]), FileKind::WeaponDump);
        assert!(index.is_kind_of("akm", "rifle_base"));
        assert!(index.is_kind_of("AKM", "akm"));
        assert!(!index.is_kind_of("akm", "Pistol_Base"));
        assert!(!index.is_kind_of("missing", "Rifle_Base"));
    }

    #[test]
    fn kind_precedence_prefers_earlier_dumps() {
        let mut weapons = FileWrapper::new(FileKind::WeaponDump, "w.json");
        weapons.content = FileContent::Weapons(vec![weapon("Shared")]);
        let mut items = FileWrapper::new(FileKind::ItemDump, "i.json");
        items.content = FileContent::Items(vec![ItemDump {
            base: DumpBase {
                classname: "Shared".to_string(),
                ..DumpBase::default()
            },
            ..ItemDump::default()
        }]);
        let index = EntityIndex::build(&[items, weapons]);
        assert_eq!(index.kind("shared"), Some(EntityKind::Weapon));
    }
}
