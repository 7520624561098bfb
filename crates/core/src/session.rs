//! Editor session: the loaded file set, the combined row grid over it and
//! every read/write path of the column catalog.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::calc::{AmmoProp, ItemCalculator, RecoilAxis};
use crate::columns::{column, CellValue, ColumnId, FilterPredicate};
use crate::files::{FileContent, FileKind, FileWrapper};
use crate::lookup::EntityIndex;
use crate::model::{TraderItem, TypeEntry, TypeFlags};
use crate::ops::OpKind;
use crate::store::FileStore;

const ECONOMY_CORE: &str = "cfgEconomyCore.xml";
const HARDLINE_SETTINGS: &str = "expansion/settings/HardlineSettings.json";
const MARKET_DIR: &str = "ExpansionMod/Market";

const BASE_MISSION_FILES: &[(FileKind, &str)] = &[
    (FileKind::Types, "db/types.xml"),
    (FileKind::SpawnableTypes, "cfgspawnabletypes.xml"),
    (FileKind::Limits, "cfglimitsdefinition.xml"),
];

const DUMP_FILES: &[(FileKind, &str)] = &[
    (FileKind::WeaponDump, "dzsm-weapondump.json"),
    (FileKind::AmmoDump, "dzsm-ammodump.json"),
    (FileKind::MagDump, "dzsm-magdump.json"),
    (FileKind::ClothingDump, "dzsm-clothingdump.json"),
    (FileKind::ItemDump, "dzsm-itemdump.json"),
];

/// One editing session over a mission/profile pair.
///
/// Loading, the combined grid, per-column getters/setters, bulk edits,
/// validation and saving all live here; the [`ItemCalculator`] is owned by
/// the session and refreshed whenever the entity set changes.
pub struct EditorSession<S: FileStore> {
    store: S,
    write_backups: bool,
    files: Vec<FileWrapper>,
    load_errors: Vec<String>,
    filters: Vec<FilterPredicate>,
    rows: Vec<String>,
    type_index: HashMap<String, (usize, usize)>,
    index: Arc<EntityIndex>,
    calc: ItemCalculator,
}

impl<S: FileStore> EditorSession<S> {
    /// New session over a store; nothing is loaded yet.
    pub fn new(store: S, write_backups: bool) -> Self {
        let index = Arc::new(EntityIndex::build(&[]));
        Self {
            store,
            write_backups,
            files: Vec::new(),
            load_errors: Vec::new(),
            filters: Vec::new(),
            rows: Vec::new(),
            type_index: HashMap::new(),
            index: index.clone(),
            calc: ItemCalculator::new(index),
        }
    }

    /// Load everything the mission references plus the profile-side market
    /// and dump files. Individual failures are recorded and the affected
    /// file is treated as empty; only planning-stage errors abort.
    pub async fn load(&mut self) -> Result<()> {
        self.load_errors.clear();
        let mut files = Vec::new();

        let mut core = FileWrapper::new(FileKind::EconomyCore, ECONOMY_CORE);
        self.fetch_into(&mut core).await;
        let ce_files = core
            .tree()
            .map(economy_core_entries)
            .unwrap_or_default();
        files.push(core);

        for (kind, path) in BASE_MISSION_FILES {
            files.push(FileWrapper::new(*kind, *path));
        }
        for (kind, path) in ce_files {
            let seen = files
                .iter()
                .any(|file| file.path.eq_ignore_ascii_case(&path));
            if !seen {
                files.push(FileWrapper::new(kind, path));
            }
        }

        files.push(FileWrapper::new(FileKind::Hardline, HARDLINE_SETTINGS));

        match self
            .store
            .read_dir(crate::files::FileLocation::Profile, MARKET_DIR)
            .await
        {
            Ok(names) => {
                for name in names {
                    if name.to_lowercase().ends_with(".json") {
                        files.push(FileWrapper::market(format!("{MARKET_DIR}/{name}")));
                    }
                }
            }
            Err(err) => {
                warn!("market directory unavailable: {err:#}");
                self.load_errors
                    .push(format!("{MARKET_DIR}: {err:#}"));
            }
        }

        for (kind, path) in DUMP_FILES {
            files.push(FileWrapper::new(*kind, *path));
        }

        for file in files.iter_mut().skip(1) {
            self.fetch_into(file).await;
        }

        self.files = files;
        self.rebuild();
        Ok(())
    }

    async fn fetch_into(&mut self, file: &mut FileWrapper) {
        let result = match self.store.read_file(file.location(), &file.path).await {
            Ok(text) => file.parse(&text).map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!(path = %file.path, "skipping file: {err:#}");
            self.load_errors.push(format!("{}: {err:#}", file.path));
            file.clear();
        }
    }

    /// Replace the loaded file set directly, bypassing the store.
    pub fn install_files(&mut self, files: Vec<FileWrapper>) {
        self.files = files;
        self.load_errors.clear();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.index = Arc::new(EntityIndex::build(&self.files));
        self.calc.set_index(self.index.clone());

        self.type_index.clear();
        self.rows.clear();
        for (file_idx, file) in self.files.iter().enumerate() {
            let Some(entries) = file.types() else { continue };
            for (entry_idx, entry) in entries.iter().enumerate() {
                let key = entry.name.to_lowercase();
                if !self.type_index.contains_key(&key) {
                    self.type_index.insert(key, (file_idx, entry_idx));
                    self.rows.push(entry.name.clone());
                }
            }
        }
    }

    /// The loaded file set.
    pub fn files(&self) -> &[FileWrapper] {
        &self.files
    }

    /// Messages for files that failed to load and were treated as empty.
    pub fn load_errors(&self) -> &[String] {
        &self.load_errors
    }

    /// The derived-attribute calculator over the loaded entity set.
    pub fn calculator(&self) -> &ItemCalculator {
        &self.calc
    }

    /// All row classnames, in file order.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Replace the active filter set.
    pub fn set_filters(&mut self, filters: Vec<FilterPredicate>) {
        self.filters = filters;
    }

    /// Rows passing every active filter.
    pub fn visible_rows(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|row| {
                self.filters
                    .iter()
                    .all(|filter| filter.matches(&self.value_get(filter.column, row)))
            })
            .cloned()
            .collect()
    }

    /// The types entry backing a row, resolved case-insensitively.
    pub fn type_entry(&self, classname: &str) -> Option<&TypeEntry> {
        let (file_idx, entry_idx) = *self.type_index.get(&classname.to_lowercase())?;
        self.files[file_idx].types().and_then(|list| list.get(entry_idx))
    }

    fn type_entry_mut(&mut self, classname: &str) -> Option<&mut TypeEntry> {
        let (file_idx, entry_idx) = *self.type_index.get(&classname.to_lowercase())?;
        self.files[file_idx]
            .types_mut()
            .and_then(|list| list.get_mut(entry_idx))
    }

    /// Trader file/item position for a top-level classname.
    pub fn find_trader_item(&self, classname: &str) -> Option<(usize, usize)> {
        for (file_idx, file) in self.files.iter().enumerate() {
            let Some(trader) = file.trader() else { continue };
            if let Some(item_idx) = trader
                .items
                .iter()
                .position(|item| item.class_name.eq_ignore_ascii_case(classname))
            {
                return Some((file_idx, item_idx));
            }
        }
        None
    }

    /// Trader file/item position of the entry listing this classname among
    /// its variants. Mutually exclusive with [`Self::find_trader_item`].
    pub fn find_variant_parent(&self, classname: &str) -> Option<(usize, usize)> {
        for (file_idx, file) in self.files.iter().enumerate() {
            let Some(trader) = file.trader() else { continue };
            if let Some(item_idx) = trader.items.iter().position(|item| {
                item.variants
                    .iter()
                    .any(|variant| variant.eq_ignore_ascii_case(classname))
            }) {
                return Some((file_idx, item_idx));
            }
        }
        None
    }

    fn trader_item(&self, classname: &str) -> Option<&TraderItem> {
        let (file_idx, item_idx) = self.find_trader_item(classname)?;
        self.files[file_idx]
            .trader()
            .and_then(|trader| trader.items.get(item_idx))
    }

    fn trader_item_mut(&mut self, classname: &str) -> Option<&mut TraderItem> {
        let (file_idx, item_idx) = self.find_trader_item(classname)?;
        self.files[file_idx]
            .trader_mut()
            .and_then(|trader| trader.items.get_mut(item_idx))
    }

    fn hardline_rarity(&self, classname: &str) -> i64 {
        self.files
            .iter()
            .find_map(|file| file.hardline())
            .map(|hardline| hardline.rarity(classname))
            .unwrap_or(0)
    }

    /// Current display value of a column for a row.
    pub fn value_get(&self, id: ColumnId, row: &str) -> CellValue {
        let number = CellValue::Number;
        let opt_number =
            |value: Option<f64>| value.map(CellValue::Number).unwrap_or(CellValue::Empty);

        match id {
            ColumnId::Name => self
                .type_entry(row)
                .map(|entry| CellValue::Text(entry.name.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::DisplayName => self
                .index
                .entity(row)
                .map(|entity| CellValue::Text(entity.display_name().to_string()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Categories => self
                .type_entry(row)
                .map(|entry| CellValue::List(entry.categories.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Usages => self
                .type_entry(row)
                .map(|entry| CellValue::List(entry.usages.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Tiers => self
                .type_entry(row)
                .map(|entry| CellValue::List(entry.values.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Nominal => self
                .type_entry(row)
                .map(|entry| number(entry.nominal as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::Lifetime => self
                .type_entry(row)
                .and_then(|entry| entry.lifetime)
                .map(|lifetime| number(lifetime as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::Restock => self
                .type_entry(row)
                .map(|entry| number(entry.restock as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::Min => self
                .type_entry(row)
                .map(|entry| number(entry.min as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::QuantMin => self
                .type_entry(row)
                .map(|entry| number(entry.quantmin as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::QuantMax => self
                .type_entry(row)
                .map(|entry| number(entry.quantmax as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::Cost => self
                .type_entry(row)
                .map(|entry| number(entry.cost as f64))
                .unwrap_or(CellValue::Empty),
            ColumnId::CountInCargo
            | ColumnId::CountInHoarder
            | ColumnId::CountInMap
            | ColumnId::CountInPlayer
            | ColumnId::Crafted
            | ColumnId::Deloot => self
                .type_entry(row)
                .and_then(|entry| entry.flags)
                .map(|flags| CellValue::Flag(read_flag(id, &flags)))
                .unwrap_or(CellValue::Empty),
            ColumnId::TraderCategory => self
                .find_trader_item(row)
                .and_then(|(file_idx, _)| self.files[file_idx].shortname.clone())
                .map(CellValue::Text)
                .unwrap_or(CellValue::Empty),
            ColumnId::VariantOf => self
                .find_variant_parent(row)
                .and_then(|(file_idx, item_idx)| {
                    self.files[file_idx]
                        .trader()
                        .and_then(|trader| trader.items.get(item_idx))
                })
                .map(|parent| CellValue::Text(parent.class_name.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::MaxPrice => opt_number(self.trader_item(row).map(|item| item.max_price_threshold)),
            ColumnId::MinPrice => opt_number(self.trader_item(row).map(|item| item.min_price_threshold)),
            ColumnId::SellPricePercent => {
                opt_number(self.trader_item(row).map(|item| item.sell_price_percent))
            }
            ColumnId::MaxStock => {
                opt_number(self.trader_item(row).map(|item| item.max_stock_threshold))
            }
            ColumnId::MinStock => {
                opt_number(self.trader_item(row).map(|item| item.min_stock_threshold))
            }
            ColumnId::QuantityPercent => {
                opt_number(self.trader_item(row).map(|item| item.quantity_percent))
            }
            ColumnId::SpawnAttachments => self
                .trader_item(row)
                .map(|item| CellValue::List(item.spawn_attachments.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Variants => self
                .trader_item(row)
                .map(|item| CellValue::List(item.variants.clone()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Rarity => number(self.hardline_rarity(row) as f64),
            ColumnId::Score => opt_number(self.calc.item_score(row).map(f64::ceil)),
            ColumnId::EstimatedNominal => {
                opt_number(self.calc.estimated_nominal(row).map(|nominal| nominal as f64))
            }
            ColumnId::Rpm => opt_number(self.calc.weapon_rpm(row)),
            ColumnId::MagSize => opt_number(self.calc.weapon_max_mag_size(row)),
            ColumnId::Dispersion => opt_number(self.calc.weapon_dispersion(row)),
            ColumnId::Damage => opt_number(self.calc.weapon_damage(row)),
            ColumnId::DamageHp => opt_number(self.calc.weapon_ammo_prop(AmmoProp::DamageHp, row)),
            ColumnId::DamageBlood => {
                opt_number(self.calc.weapon_ammo_prop(AmmoProp::DamageBlood, row))
            }
            ColumnId::DamageArmor => {
                opt_number(self.calc.weapon_ammo_prop(AmmoProp::DamageArmor, row))
            }
            ColumnId::Damage100m => opt_number(self.calc.weapon_damage_at_distance(row, 100.0)),
            ColumnId::OneShotDistance => opt_number(self.calc.weapon_damage_distance(row, 100.0)),
            ColumnId::BulletSpeed => opt_number(self.calc.weapon_bullet_speed(row)),
            ColumnId::Range => opt_number(self.calc.weapon_range(row)),
            ColumnId::RecoilX => opt_number(self.calc.weapon_recoil(RecoilAxis::X, row)),
            ColumnId::RecoilY => opt_number(self.calc.weapon_recoil(RecoilAxis::Y, row)),
            ColumnId::MaxCargo => number(self.calc.max_cargo_space(row)),
            ColumnId::CargoSize => self
                .index
                .clothing(row)
                .map(|clothing| clothing.cargo_size.as_slice())
                .or_else(|| self.index.item(row).map(|item| item.cargo_size.as_slice()))
                .filter(|size| size.len() >= 2)
                .map(|size| number(size[0] * size[1]))
                .unwrap_or(CellValue::Empty),
            ColumnId::WeaponSlots => opt_number(self.calc.slot_count(row, "shoulder")),
            ColumnId::PistolSlots => opt_number(self.calc.slot_count(row, "pistol")),
            ColumnId::HitPoints => {
                opt_number(self.index.entity(row).and_then(|entity| entity.hit_points()))
            }
            ColumnId::ArmorProjectile => {
                opt_number(self.index.clothing(row).map(|clothing| clothing.armor_projectile_hp))
            }
            ColumnId::ArmorMelee => opt_number(self.index.clothing(row).map(|clothing| clothing.armor_melee_hp)),
            ColumnId::ArmorFrag => opt_number(self.index.clothing(row).map(|clothing| clothing.armor_frag_hp)),
            ColumnId::ArmorInfected => {
                opt_number(self.index.clothing(row).map(|clothing| clothing.armor_infected_hp))
            }
            ColumnId::Isolation => {
                opt_number(self.index.clothing(row).map(|clothing| clothing.heat_isolation))
            }
            ColumnId::Visibility => {
                opt_number(self.index.clothing(row).map(|clothing| clothing.visibility_modifier))
            }
            ColumnId::LootCategory => self
                .index
                .entity(row)
                .and_then(|entity| entity.loot_category())
                .filter(|category| !category.is_empty())
                .map(|category| CellValue::Text(category.to_string()))
                .unwrap_or(CellValue::Empty),
            ColumnId::LootTag => self
                .index
                .entity(row)
                .map(|entity| CellValue::List(entity.loot_tag().to_vec()))
                .unwrap_or(CellValue::Empty),
            ColumnId::ItemInfo => self
                .index
                .entity(row)
                .map(|entity| CellValue::List(entity.item_info().to_vec()))
                .unwrap_or(CellValue::Empty),
            ColumnId::Weight => opt_number(self.index.entity(row).map(|entity| entity.weight())),
        }
    }

    /// Write a column value for a row. Returns whether the mutation was
    /// applied; read-only columns always return `false`.
    pub fn value_set(&mut self, id: ColumnId, row: &str, value: &CellValue) -> bool {
        match id {
            ColumnId::Name => match value.as_text() {
                Some(new_name) => self.rename_row(row, new_name),
                None => false,
            },
            ColumnId::Categories => self.set_type_list(row, value, |entry| &mut entry.categories),
            ColumnId::Usages => self.set_type_list(row, value, |entry| &mut entry.usages),
            ColumnId::Tiers => self.set_type_list(row, value, |entry| &mut entry.values),
            ColumnId::Nominal => self.set_type_number(row, value, |entry, number| {
                entry.nominal = number;
                if entry.min > entry.nominal {
                    entry.min = entry.nominal;
                }
            }),
            ColumnId::Lifetime => {
                self.set_type_number(row, value, |entry, number| entry.lifetime = Some(number))
            }
            ColumnId::Restock => {
                self.set_type_number(row, value, |entry, number| entry.restock = number)
            }
            ColumnId::Min => self.set_type_number(row, value, |entry, number| {
                entry.min = number;
                if entry.min > entry.nominal {
                    entry.nominal = entry.min;
                }
            }),
            ColumnId::QuantMin => self.set_type_number(row, value, |entry, number| {
                entry.quantmin = number;
                if entry.quantmin == -1 && entry.quantmax != -1 {
                    entry.quantmax = -1;
                } else if entry.quantmin != -1 && entry.quantmin > entry.quantmax {
                    entry.quantmax = entry.quantmin;
                }
            }),
            ColumnId::QuantMax => self.set_type_number(row, value, |entry, number| {
                entry.quantmax = number;
                if entry.quantmax == -1 && entry.quantmin != -1 {
                    entry.quantmin = -1;
                } else if entry.quantmax != -1 && entry.quantmin > entry.quantmax {
                    entry.quantmin = entry.quantmax;
                }
            }),
            ColumnId::Cost => self.set_type_number(row, value, |entry, number| entry.cost = number),
            ColumnId::CountInCargo
            | ColumnId::CountInHoarder
            | ColumnId::CountInMap
            | ColumnId::CountInPlayer
            | ColumnId::Crafted
            | ColumnId::Deloot => match value.as_flag() {
                Some(flag) => match self.type_entry_mut(row) {
                    Some(entry) => {
                        let flags = entry.flags.get_or_insert_with(TypeFlags::default);
                        write_flag(id, flags, flag);
                        true
                    }
                    None => false,
                },
                None => false,
            },
            ColumnId::TraderCategory => match value.as_text() {
                Some(category) => self.set_trader_category(row, category),
                None => false,
            },
            ColumnId::VariantOf => match value.as_text() {
                Some(parent) => self.set_variant_parent(row, parent),
                None => false,
            },
            ColumnId::MaxPrice => self.set_trader_number(row, value, |item, number| {
                item.max_price_threshold = number
            }),
            ColumnId::MinPrice => self.set_trader_number(row, value, |item, number| {
                item.min_price_threshold = number
            }),
            ColumnId::SellPricePercent => self.set_trader_number(row, value, |item, number| {
                item.sell_price_percent = number
            }),
            ColumnId::MaxStock => self.set_trader_number(row, value, |item, number| {
                item.max_stock_threshold = number
            }),
            ColumnId::MinStock => self.set_trader_number(row, value, |item, number| {
                item.min_stock_threshold = number
            }),
            ColumnId::QuantityPercent => self.set_trader_number(row, value, |item, number| {
                item.quantity_percent = number
            }),
            ColumnId::SpawnAttachments => match (value.as_list(), self.trader_item_mut(row)) {
                (Some(list), Some(item)) => {
                    item.spawn_attachments = list.to_vec();
                    true
                }
                _ => false,
            },
            ColumnId::Variants => match (value.as_list(), self.trader_item_mut(row)) {
                (Some(list), Some(item)) => {
                    item.variants = list.to_vec();
                    true
                }
                _ => false,
            },
            ColumnId::Rarity => match value.as_number() {
                Some(rarity) if (0.0..=100.0).contains(&rarity) => {
                    let Some(hardline) = self
                        .files
                        .iter_mut()
                        .find_map(|file| file.hardline_mut())
                    else {
                        return false;
                    };
                    hardline.set_rarity(row, rarity.round() as i64);
                    true
                }
                _ => false,
            },
            ColumnId::DisplayName
            | ColumnId::Score
            | ColumnId::EstimatedNominal
            | ColumnId::Rpm
            | ColumnId::MagSize
            | ColumnId::Dispersion
            | ColumnId::Damage
            | ColumnId::DamageHp
            | ColumnId::DamageBlood
            | ColumnId::DamageArmor
            | ColumnId::Damage100m
            | ColumnId::OneShotDistance
            | ColumnId::BulletSpeed
            | ColumnId::Range
            | ColumnId::RecoilX
            | ColumnId::RecoilY
            | ColumnId::MaxCargo
            | ColumnId::CargoSize
            | ColumnId::WeaponSlots
            | ColumnId::PistolSlots
            | ColumnId::HitPoints
            | ColumnId::ArmorProjectile
            | ColumnId::ArmorMelee
            | ColumnId::ArmorFrag
            | ColumnId::ArmorInfected
            | ColumnId::Isolation
            | ColumnId::Visibility
            | ColumnId::LootCategory
            | ColumnId::LootTag
            | ColumnId::ItemInfo
            | ColumnId::Weight => false,
        }
    }

    fn set_type_number(
        &mut self,
        row: &str,
        value: &CellValue,
        write: impl FnOnce(&mut TypeEntry, i64),
    ) -> bool {
        match (value.as_number(), self.type_entry_mut(row)) {
            (Some(number), Some(entry)) => {
                write(entry, number.round() as i64);
                true
            }
            _ => false,
        }
    }

    fn set_type_list(
        &mut self,
        row: &str,
        value: &CellValue,
        select: impl FnOnce(&mut TypeEntry) -> &mut Vec<String>,
    ) -> bool {
        match (value.as_list(), self.type_entry_mut(row)) {
            (Some(list), Some(entry)) => {
                *select(entry) = list.to_vec();
                true
            }
            _ => false,
        }
    }

    fn set_trader_number(
        &mut self,
        row: &str,
        value: &CellValue,
        write: impl FnOnce(&mut TraderItem, f64),
    ) -> bool {
        match (value.as_number(), self.trader_item_mut(row)) {
            (Some(number), Some(item)) => {
                write(item, number);
                true
            }
            _ => false,
        }
    }

    /// Rename a row's classname everywhere it appears: the types entry,
    /// spawnable-types entries, the hardline rarity key and the top-level
    /// trader entry. Fails when the target name is already taken.
    fn rename_row(&mut self, row: &str, new_name: &str) -> bool {
        if new_name.is_empty() || self.type_entry(new_name).is_some() {
            return false;
        }
        if self.type_entry(row).is_none() {
            return false;
        }

        let old_key = row.to_lowercase();
        for file in &mut self.files {
            if let Some(entries) = file.types_mut() {
                for entry in entries.iter_mut() {
                    if entry.name.to_lowercase() == old_key {
                        entry.name = new_name.to_string();
                    }
                }
            }
            if let FileContent::Spawnable(entries) = &mut file.content {
                for entry in entries.iter_mut() {
                    if entry.name.to_lowercase() == old_key {
                        entry.name = new_name.to_string();
                    }
                }
            }
            if let Some(hardline) = file.hardline_mut() {
                let new_key = new_name.to_lowercase();
                if !hardline.item_rarity.contains_key(&new_key) {
                    if let Some(rarity) = hardline.item_rarity.remove(&old_key) {
                        hardline.item_rarity.insert(new_key, rarity);
                    }
                }
            }
            if let Some(trader) = file.trader_mut() {
                for item in trader.items.iter_mut() {
                    if item.class_name.eq_ignore_ascii_case(row) {
                        item.class_name = new_name.to_string();
                    }
                }
            }
        }

        self.rebuild();
        true
    }

    /// Move a top-level trader entry to another category file, creating it
    /// with editor defaults when it traded nowhere before. Variants cannot
    /// be top-level entries.
    fn set_trader_category(&mut self, row: &str, category: &str) -> bool {
        if self.find_variant_parent(row).is_some() {
            return false;
        }

        let existing = self.find_trader_item(row).and_then(|(file_idx, item_idx)| {
            self.files[file_idx]
                .trader_mut()
                .map(|trader| trader.items.remove(item_idx))
        });

        let target = self.files.iter_mut().find(|file| {
            file.kind == FileKind::Trader
                && file
                    .shortname
                    .as_deref()
                    .map(|shortname| shortname.eq_ignore_ascii_case(category))
                    .unwrap_or(false)
        });
        if let Some(file) = target {
            if let Some(trader) = file.trader_mut() {
                trader
                    .items
                    .push(existing.unwrap_or_else(|| TraderItem::new(row.to_string())));
            }
        }
        true
    }

    /// Re-parent a variant classname. Top-level trader entries cannot also
    /// be variants; an empty parent just detaches.
    fn set_variant_parent(&mut self, row: &str, parent: &str) -> bool {
        if self.find_trader_item(row).is_some() {
            return false;
        }

        if let Some((file_idx, item_idx)) = self.find_variant_parent(row) {
            if let Some(item) = self.files[file_idx]
                .trader_mut()
                .and_then(|trader| trader.items.get_mut(item_idx))
            {
                item.variants
                    .retain(|variant| !variant.eq_ignore_ascii_case(row));
            }
        }

        if !parent.is_empty() {
            if let Some(item) = self.trader_item_mut(parent) {
                item.variants.push(row.to_string());
            }
        }
        true
    }

    /// Apply a bulk operation to every visible row of a column. Rows whose
    /// current value is empty or that the operation cannot consume are
    /// skipped; returns the number of rows written.
    pub fn apply_bulk(&mut self, id: ColumnId, op: OpKind, input: &str) -> usize {
        if !column(id).operations.contains(&op) {
            return 0;
        }
        let Some(modifier) = op.modifier(input) else {
            return 0;
        };

        let mut written = 0;
        for row in self.visible_rows() {
            let current = self.value_get(id, &row);
            if current.is_empty() {
                continue;
            }
            if let Some(next) = op.apply(&current, &modifier) {
                if self.value_set(id, &row, &next) {
                    written += 1;
                }
            }
        }
        written
    }

    /// Advisory consistency check over every types entry. Returns whether
    /// everything passed plus one message per finding; nothing is mutated.
    pub fn validate(&self) -> (bool, Vec<String>) {
        let mut messages = Vec::new();
        for file in &self.files {
            let Some(entries) = file.types() else { continue };
            for entry in entries {
                if entry.name.is_empty() {
                    messages.push(format!("{}: entry without a classname", file.path));
                    continue;
                }
                if entry.min > entry.nominal {
                    messages.push(format!("{}: min {} exceeds nominal {}", entry.name, entry.min, entry.nominal));
                }
                if (entry.quantmin == -1) != (entry.quantmax == -1) {
                    messages.push(format!(
                        "{}: quantmin {} and quantmax {} must both be -1 or both be percentages",
                        entry.name, entry.quantmin, entry.quantmax
                    ));
                } else if entry.quantmin != -1 {
                    if entry.quantmin > entry.quantmax {
                        messages.push(format!(
                            "{}: quantmin {} exceeds quantmax {}",
                            entry.name, entry.quantmin, entry.quantmax
                        ));
                    }
                    if entry.quantmax > 100 || entry.quantmin < -1 {
                        messages.push(format!(
                            "{}: quantity percentages out of range ({}..{})",
                            entry.name, entry.quantmin, entry.quantmax
                        ));
                    }
                }
                if entry.nominal < 0 || entry.min < 0 {
                    messages.push(format!("{}: negative spawn counts", entry.name));
                }
            }
        }
        (messages.is_empty(), messages)
    }

    /// Serialize and write back every writable file, fail-fast. Reference
    /// files (spawnable types, limits, dumps) are never written.
    pub async fn save(&self) -> Result<usize> {
        let mut written = 0;
        for file in &self.files {
            if file.skip_save() || matches!(file.content, FileContent::Empty) {
                continue;
            }
            let text = file
                .serialize()
                .with_context(|| format!("failed to serialize {}", file.path))?;
            self.store
                .write_file(file.location(), &file.path, &text, self.write_backups)
                .await
                .with_context(|| format!("failed to save {}", file.path))?;
            written += 1;
        }
        Ok(written)
    }
}

fn read_flag(id: ColumnId, flags: &TypeFlags) -> bool {
    match id {
        ColumnId::CountInCargo => flags.count_in_cargo,
        ColumnId::CountInHoarder => flags.count_in_hoarder,
        ColumnId::CountInMap => flags.count_in_map,
        ColumnId::CountInPlayer => flags.count_in_player,
        ColumnId::Crafted => flags.crafted,
        _ => flags.deloot,
    }
}

fn write_flag(id: ColumnId, flags: &mut TypeFlags, value: bool) {
    match id {
        ColumnId::CountInCargo => flags.count_in_cargo = value,
        ColumnId::CountInHoarder => flags.count_in_hoarder = value,
        ColumnId::CountInMap => flags.count_in_map = value,
        ColumnId::CountInPlayer => flags.count_in_player = value,
        ColumnId::Crafted => flags.crafted = value,
        _ => flags.deloot = value,
    }
}

/// CE include entries of an economy core document as (kind, path) pairs.
fn economy_core_entries(tree: &crate::files::xml::XmlElement) -> Vec<(FileKind, String)> {
    let mut entries = Vec::new();
    for ce in tree.children_named("ce") {
        let folder = ce.attr("folder").unwrap_or("").trim_matches('/');
        for file in ce.children_named("file") {
            let Some(name) = file.attr("name") else { continue };
            let kind = match file.attr("type") {
                Some("types") => FileKind::Types,
                Some("spawnabletypes") => FileKind::SpawnableTypes,
                _ => continue,
            };
            let path = if folder.is_empty() {
                name.to_string()
            } else {
                format!("{folder}/{name}")
            };
            entries.push((kind, path));
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{FilterMode, MatchKind};
    use crate::files::FileLocation;
    use crate::model::{AmmoDump, ClothingDump, DumpBase, SpawnableEntry, TraderFile, WeaponDump};
    use crate::store::DiskStore;
    use tempfile::TempDir;

    fn entry(name: &str, nominal: i64, min: i64) -> TypeEntry {
        TypeEntry {
            name: name.to_string(),
            nominal,
            min,
            quantmin: -1,
            quantmax: -1,
            restock: 1800,
            cost: 100,
            ..TypeEntry::default()
        }
    }

    fn session_with(files: Vec<FileWrapper>) -> (EditorSession<DiskStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut session = EditorSession::new(
            DiskStore::new(dir.path().join("mission"), dir.path().join("profile")),
            false,
        );
        session.install_files(files);
        (session, dir)
    }

    fn types_file(entries: Vec<TypeEntry>) -> FileWrapper {
        let mut file = FileWrapper::new(FileKind::Types, "db/types.xml");
        file.content = FileContent::Types(entries);
        file
    }

    fn trader_file(shortname: &str, items: Vec<TraderItem>) -> FileWrapper {
        let mut file = FileWrapper::market(format!("ExpansionMod/Market/{shortname}.json"));
        file.content = FileContent::Trader(TraderFile {
            items,
            ..TraderFile::default()
        });
        file
    }

    #[test]
    fn writing_nominal_pulls_min_down() {
        let (mut session, _dir) = session_with(vec![types_file(vec![entry("AKM", 20, 10)])]);
        assert!(session.value_set(ColumnId::Nominal, "akm", &CellValue::Number(5.0)));
        let akm = session.type_entry("AKM").unwrap();
        assert_eq!(akm.nominal, 5);
        assert_eq!(akm.min, 5);
    }

    #[test]
    fn writing_min_pushes_nominal_up() {
        let (mut session, _dir) = session_with(vec![types_file(vec![entry("AKM", 20, 10)])]);
        assert!(session.value_set(ColumnId::Min, "AKM", &CellValue::Number(30.0)));
        let akm = session.type_entry("AKM").unwrap();
        assert_eq!(akm.min, 30);
        assert_eq!(akm.nominal, 30);
    }

    #[test]
    fn quantity_bounds_keep_their_pairing() {
        let (mut session, _dir) = session_with(vec![types_file(vec![entry("Mag", 10, 0)])]);

        assert!(session.value_set(ColumnId::QuantMin, "Mag", &CellValue::Number(60.0)));
        let mag = session.type_entry("Mag").unwrap();
        assert_eq!((mag.quantmin, mag.quantmax), (60, 60));

        assert!(session.value_set(ColumnId::QuantMax, "Mag", &CellValue::Number(-1.0)));
        let mag = session.type_entry("Mag").unwrap();
        assert_eq!((mag.quantmin, mag.quantmax), (-1, -1));
    }

    #[test]
    fn rename_rejects_taken_names_and_propagates() {
        let mut spawnable = FileWrapper::new(FileKind::SpawnableTypes, "cfgspawnabletypes.xml");
        spawnable.content = FileContent::Spawnable(vec![SpawnableEntry {
            name: "AKM".to_string(),
            attachments: Vec::new(),
        }]);
        let mut hardline = FileWrapper::new(FileKind::Hardline, "expansion/settings/HardlineSettings.json");
        let mut hardline_content = crate::model::HardlineFile::default();
        hardline_content.set_rarity("AKM", 40);
        hardline.content = FileContent::Hardline(hardline_content);

        let (mut session, _dir) = session_with(vec![
            types_file(vec![entry("AKM", 10, 5), entry("M4A1", 8, 4)]),
            spawnable,
            hardline,
            trader_file("Weapons", vec![TraderItem::new("AKM".to_string())]),
        ]);

        assert!(!session.value_set(ColumnId::Name, "AKM", &CellValue::Text("m4a1".to_string())));
        assert!(session.value_set(ColumnId::Name, "AKM", &CellValue::Text("AKM_Black".to_string())));

        assert!(session.type_entry("AKM").is_none());
        assert!(session.type_entry("akm_black").is_some());
        assert_eq!(session.hardline_rarity("AKM_Black"), 40);
        assert_eq!(session.hardline_rarity("AKM"), 0);
        assert!(session.find_trader_item("AKM_Black").is_some());
        match &session.files()[1].content {
            FileContent::Spawnable(entries) => assert_eq!(entries[0].name, "AKM_Black"),
            other => panic!("unexpected content {other:?}"),
        }
    }

    #[test]
    fn trader_category_moves_or_creates_entries() {
        let (mut session, _dir) = session_with(vec![
            types_file(vec![entry("AKM", 10, 5)]),
            trader_file("Weapons", Vec::new()),
            trader_file("Rifles", Vec::new()),
        ]);

        assert!(session.value_set(
            ColumnId::TraderCategory,
            "AKM",
            &CellValue::Text("Weapons".to_string())
        ));
        let created = session.trader_item("AKM").unwrap();
        assert_eq!(created.max_price_threshold, 10_000.0);
        assert_eq!(created.min_stock_threshold, 1.0);

        assert!(session.value_set(ColumnId::MaxPrice, "AKM", &CellValue::Number(5000.0)));
        assert!(session.value_set(
            ColumnId::TraderCategory,
            "AKM",
            &CellValue::Text("Rifles".to_string())
        ));
        assert_eq!(
            session.value_get(ColumnId::TraderCategory, "AKM"),
            CellValue::Text("Rifles".to_string())
        );
        // the existing entry moved along, keeping its edited price
        assert_eq!(session.trader_item("AKM").unwrap().max_price_threshold, 5000.0);
    }

    #[test]
    fn variants_cannot_be_top_level_and_vice_versa() {
        let mut parent = TraderItem::new("AKM".to_string());
        parent.variants.push("AKM_Black".to_string());
        let (mut session, _dir) = session_with(vec![
            types_file(vec![entry("AKM", 10, 5), entry("AKM_Black", 0, 0)]),
            trader_file("Weapons", vec![parent]),
        ]);

        assert!(session.find_variant_parent("akm_black").is_some());
        assert!(!session.value_set(
            ColumnId::TraderCategory,
            "AKM_Black",
            &CellValue::Text("Weapons".to_string())
        ));
        assert!(!session.value_set(
            ColumnId::VariantOf,
            "AKM",
            &CellValue::Text("AKM_Black".to_string())
        ));

        // detaching works and frees the name for a top-level entry
        assert!(session.value_set(ColumnId::VariantOf, "AKM_Black", &CellValue::Text(String::new())));
        assert!(session.find_variant_parent("AKM_Black").is_none());
    }

    #[test]
    fn rarity_setter_rejects_out_of_range() {
        let mut hardline = FileWrapper::new(FileKind::Hardline, "expansion/settings/HardlineSettings.json");
        hardline.content = FileContent::Hardline(crate::model::HardlineFile::default());
        let (mut session, _dir) =
            session_with(vec![types_file(vec![entry("AKM", 10, 5)]), hardline]);

        assert!(!session.value_set(ColumnId::Rarity, "AKM", &CellValue::Number(150.0)));
        assert!(session.value_set(ColumnId::Rarity, "AKM", &CellValue::Number(60.0)));
        assert_eq!(session.value_get(ColumnId::Rarity, "akm"), CellValue::Number(60.0));
    }

    #[test]
    fn bulk_multiply_percent_only_touches_visible_rows() {
        let mut military = entry("AKM", 20, 0);
        military.usages = vec!["Military".to_string()];
        let mut town = entry("Hoe", 30, 0);
        town.usages = vec!["Town".to_string()];
        let (mut session, _dir) = session_with(vec![types_file(vec![military, town])]);

        session.set_filters(vec![FilterPredicate {
            column: ColumnId::Usages,
            mode: FilterMode::Includes,
            match_kind: MatchKind::Exact,
            needle: "Military".to_string(),
        }]);
        assert_eq!(session.visible_rows(), vec!["AKM".to_string()]);

        let written = session.apply_bulk(ColumnId::Nominal, OpKind::MultiplyPercent, "50");
        assert_eq!(written, 1);
        assert_eq!(session.type_entry("AKM").unwrap().nominal, 10);
        assert_eq!(session.type_entry("Hoe").unwrap().nominal, 30);
    }

    #[test]
    fn dump_columns_read_through_to_the_reference_records() {
        let mut weapons = FileWrapper::new(FileKind::WeaponDump, "dzsm-weapondump.json");
        weapons.content = FileContent::Weapons(vec![WeaponDump {
            base: DumpBase {
                classname: "AKM".to_string(),
                hit_points: 200.0,
                loot_category: "Crafted".to_string(),
                ..DumpBase::default()
            },
            init_speed_multiplier: 1.0,
            ammo: vec!["Ammo_762x39".to_string()],
            ..WeaponDump::default()
        }]);
        let mut ammo = FileWrapper::new(FileKind::AmmoDump, "dzsm-ammodump.json");
        ammo.content = FileContent::Ammo(vec![AmmoDump {
            classname: "Ammo_762x39".to_string(),
            damage_hp: 110.0,
            damage_blood: 120.0,
            damage_armor: 0.7,
            init_speed: 700.0,
            typical_speed: 700.0,
            ..AmmoDump::default()
        }]);
        let mut clothing = FileWrapper::new(FileKind::ClothingDump, "dzsm-clothingdump.json");
        clothing.content = FileContent::Clothing(vec![ClothingDump {
            base: DumpBase {
                classname: "TacticalVest".to_string(),
                loot_tag: vec!["shelves".to_string()],
                ..DumpBase::default()
            },
            armor_projectile_hp: 0.6,
            heat_isolation: 0.5,
            cargo_size: vec![4.0, 3.0],
            ..ClothingDump::default()
        }]);
        let (mut session, _dir) = session_with(vec![
            types_file(vec![entry("AKM", 10, 5), entry("TacticalVest", 10, 5)]),
            weapons,
            ammo,
            clothing,
        ]);

        assert_eq!(session.value_get(ColumnId::DamageHp, "akm"), CellValue::Number(110.0));
        assert_eq!(session.value_get(ColumnId::DamageBlood, "AKM"), CellValue::Number(120.0));
        assert_eq!(session.value_get(ColumnId::DamageArmor, "AKM"), CellValue::Number(0.7));
        // air friction 0 leaves the muzzle damage intact at distance
        assert_eq!(session.value_get(ColumnId::Damage100m, "AKM"), CellValue::Number(110.0));
        assert_eq!(session.value_get(ColumnId::HitPoints, "AKM"), CellValue::Number(200.0));
        assert_eq!(
            session.value_get(ColumnId::LootCategory, "AKM"),
            CellValue::Text("Crafted".to_string())
        );

        assert_eq!(
            session.value_get(ColumnId::CargoSize, "tacticalvest"),
            CellValue::Number(12.0)
        );
        assert_eq!(
            session.value_get(ColumnId::ArmorProjectile, "TacticalVest"),
            CellValue::Number(0.6)
        );
        assert_eq!(
            session.value_get(ColumnId::Isolation, "TacticalVest"),
            CellValue::Number(0.5)
        );
        assert_eq!(
            session.value_get(ColumnId::LootTag, "TacticalVest"),
            CellValue::List(vec!["shelves".to_string()])
        );

        // weapon-only columns stay empty on other rows and reject writes
        assert_eq!(session.value_get(ColumnId::DamageHp, "TacticalVest"), CellValue::Empty);
        assert!(!session.value_set(ColumnId::DamageHp, "AKM", &CellValue::Number(1.0)));
    }

    #[test]
    fn bulk_rejects_ops_outside_the_column_catalog() {
        let (mut session, _dir) = session_with(vec![types_file(vec![entry("AKM", 10, 5)])]);
        assert_eq!(session.apply_bulk(ColumnId::Nominal, OpKind::AddItem, "x"), 0);
        assert_eq!(session.apply_bulk(ColumnId::Score, OpKind::Add, "1"), 0);
    }

    #[test]
    fn validate_reports_broken_quantity_pairs() {
        let mut broken = entry("Mag", 10, 0);
        broken.quantmin = 50;
        broken.quantmax = -1;
        let (session, _dir) = session_with(vec![types_file(vec![entry("AKM", 10, 5), broken])]);
        let (ok, messages) = session.validate();
        assert!(!ok);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Mag"));
    }

    #[tokio::test]
    async fn load_collects_per_file_failures_instead_of_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("mission"), dir.path().join("profile"));
        store
            .write_file(
                FileLocation::Mission,
                ECONOMY_CORE,
                r#"<economycore><ce folder="db"><file name="custom.xml" type="types"/></ce></economycore>"#,
                false,
            )
            .await
            .unwrap();
        store
            .write_file(
                FileLocation::Mission,
                "db/types.xml",
                r#"<types><type name="AKM"><nominal>10</nominal></type></types>"#,
                false,
            )
            .await
            .unwrap();
        store
            .write_file(
                FileLocation::Mission,
                "db/custom.xml",
                r#"<types><type name="CustomThing"/></types>"#,
                false,
            )
            .await
            .unwrap();
        store
            .write_file(
                FileLocation::Profile,
                "ExpansionMod/Market/Weapons.json",
                r#"{"Items": [{"ClassName": "AKM"}]}"#,
                false,
            )
            .await
            .unwrap();

        let mut session = EditorSession::new(store, false);
        session.load().await.unwrap();

        // spawnable, limits, hardline and the five dumps are all missing
        assert!(!session.load_errors().is_empty());
        assert_eq!(session.rows(), ["AKM", "CustomThing"]);
        assert_eq!(
            session.value_get(ColumnId::TraderCategory, "akm"),
            CellValue::Text("Weapons".to_string())
        );
        // missing types entries still got their defaults backfilled
        assert_eq!(session.type_entry("AKM").unwrap().restock, 1800);
    }

    #[tokio::test]
    async fn save_skips_reference_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().join("mission"), dir.path().join("profile"));
        let mut session = EditorSession::new(
            DiskStore::new(dir.path().join("mission"), dir.path().join("profile")),
            false,
        );

        let mut spawnable = FileWrapper::new(FileKind::SpawnableTypes, "cfgspawnabletypes.xml");
        spawnable.content = FileContent::Spawnable(Vec::new());
        session.install_files(vec![
            types_file(vec![entry("AKM", 10, 5)]),
            spawnable,
            trader_file("Weapons", vec![TraderItem::new("AKM".to_string())]),
        ]);

        let written = session.save().await.unwrap();
        assert_eq!(written, 2);

        let types_text = store
            .read_file(FileLocation::Mission, "db/types.xml")
            .await
            .unwrap();
        assert!(types_text.contains("AKM"));
        assert!(store
            .read_file(FileLocation::Mission, "cfgspawnabletypes.xml")
            .await
            .is_err());
    }
}
