//! Column catalog: cell values, per-column metadata, filter predicates and
//! UI-independent cell renderers.

use std::fmt;

use once_cell::sync::Lazy;

use crate::ops::{OpKind, LIST_OPS, NUMBER_OPS, TEXT_OPS};

/// A single cell value flowing between getters, setters and the bulk
/// executor.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value for this row, e.g. a weapon column on a clothing row.
    Empty,
    Number(f64),
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            CellValue::Flag(value) => Some(if *value { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            CellValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CellValue::Flag(value) => Some(*value),
            CellValue::Number(value) => Some(*value != 0.0),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(value) => {
                if value.fract() == 0.0 {
                    write!(f, "{}", *value as i64)
                } else {
                    write!(f, "{value}")
                }
            }
            CellValue::Text(value) => f.write_str(value),
            CellValue::Flag(value) => f.write_str(if *value { "1" } else { "0" }),
            CellValue::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

/// Identifies a column of the combined grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnId {
    // Types file columns.
    Name,
    Categories,
    Usages,
    Tiers,
    Nominal,
    Lifetime,
    Restock,
    Min,
    QuantMin,
    QuantMax,
    Cost,
    CountInCargo,
    CountInHoarder,
    CountInMap,
    CountInPlayer,
    Crafted,
    Deloot,
    // Expansion market/hardline columns.
    TraderCategory,
    VariantOf,
    MaxPrice,
    MinPrice,
    SellPricePercent,
    MaxStock,
    MinStock,
    QuantityPercent,
    SpawnAttachments,
    Variants,
    Rarity,
    // Derived, read-only.
    DisplayName,
    Score,
    EstimatedNominal,
    Rpm,
    MagSize,
    Dispersion,
    Damage,
    DamageHp,
    DamageBlood,
    DamageArmor,
    Damage100m,
    OneShotDistance,
    BulletSpeed,
    Range,
    RecoilX,
    RecoilY,
    MaxCargo,
    CargoSize,
    WeaponSlots,
    PistolSlots,
    HitPoints,
    ArmorProjectile,
    ArmorMelee,
    ArmorFrag,
    ArmorInfected,
    Isolation,
    Visibility,
    LootCategory,
    LootTag,
    ItemInfo,
    Weight,
}

/// Static metadata for one grid column.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub id: ColumnId,
    pub header: &'static str,
    pub editable: bool,
    pub filterable: bool,
    /// Bulk operations applicable to this column; empty for read-only ones.
    pub operations: &'static [OpKind],
    /// Fixed option list for dropdown-backed list columns.
    pub dropdown: Option<&'static [&'static str]>,
}

impl Column {
    const fn number(id: ColumnId, header: &'static str) -> Self {
        Self {
            id,
            header,
            editable: true,
            filterable: true,
            operations: NUMBER_OPS,
            dropdown: None,
        }
    }

    const fn list(id: ColumnId, header: &'static str, dropdown: &'static [&'static str]) -> Self {
        Self {
            id,
            header,
            editable: true,
            filterable: true,
            operations: LIST_OPS,
            dropdown: Some(dropdown),
        }
    }

    const fn flag(id: ColumnId, header: &'static str) -> Self {
        Self {
            id,
            header,
            editable: true,
            filterable: true,
            operations: NUMBER_OPS,
            dropdown: None,
        }
    }

    const fn derived(id: ColumnId, header: &'static str) -> Self {
        Self {
            id,
            header,
            editable: false,
            filterable: true,
            operations: &[],
            dropdown: None,
        }
    }
}

/// Category tags known by the vanilla economy.
pub const CATEGORY_OPTIONS: &[&str] = &[
    "weapons",
    "explosives",
    "clothes",
    "containers",
    "tools",
    "vehicleparts",
    "food",
];

/// Usage tags known by the vanilla economy.
pub const USAGE_OPTIONS: &[&str] = &[
    "Military",
    "Police",
    "Medic",
    "Firefighter",
    "Industrial",
    "Farm",
    "Coast",
    "Town",
    "Village",
    "Hunting",
    "Office",
    "School",
    "Prison",
    "Lunapark",
    "SeasonalEvent",
    "ContaminatedArea",
    "Historical",
];

/// Tier tags; maps shipped with expansion mods go well past the vanilla
/// four.
pub const TIER_OPTIONS: &[&str] = &[
    "Tier1", "Tier2", "Tier3", "Tier4", "Tier5", "Tier6", "Tier7", "Tier8", "Tier9", "Tier10",
    "Tier11", "Tier12", "Tier13", "Tier14", "Tier15", "Tier16", "Tier17",
];

/// Rarity labels indexed by `rarity / 10`.
pub const RARITY_LABELS: &[&str] = &[
    "NONE",
    "Poor",
    "Common",
    "Uncommon",
    "Rare",
    "Epic",
    "Legendary",
    "Mythic",
    "Exotic",
    "Quest",
];

/// All grid columns in display order.
pub static COLUMNS: Lazy<Vec<Column>> = Lazy::new(|| {
    vec![
        Column {
            id: ColumnId::Name,
            header: "Name",
            editable: true,
            filterable: true,
            operations: TEXT_OPS,
            dropdown: None,
        },
        Column::derived(ColumnId::DisplayName, "Display Name"),
        Column::list(ColumnId::Categories, "Category", CATEGORY_OPTIONS),
        Column::list(ColumnId::Usages, "Usage", USAGE_OPTIONS),
        Column::list(ColumnId::Tiers, "Tier", TIER_OPTIONS),
        Column::number(ColumnId::Nominal, "Nominal"),
        Column::number(ColumnId::Lifetime, "Lifetime"),
        Column::number(ColumnId::Restock, "Restock"),
        Column::number(ColumnId::Min, "Min"),
        Column::number(ColumnId::QuantMin, "Quantmin"),
        Column::number(ColumnId::QuantMax, "Quantmax"),
        Column::number(ColumnId::Cost, "Cost"),
        Column::flag(ColumnId::CountInCargo, "Count in Cargo"),
        Column::flag(ColumnId::CountInHoarder, "Count in Hoarder"),
        Column::flag(ColumnId::CountInMap, "Count in Map"),
        Column::flag(ColumnId::CountInPlayer, "Count in Player"),
        Column::flag(ColumnId::Crafted, "Crafted"),
        Column::flag(ColumnId::Deloot, "Deloot"),
        Column {
            id: ColumnId::TraderCategory,
            header: "Trader Category",
            editable: true,
            filterable: true,
            operations: TEXT_OPS,
            dropdown: None,
        },
        Column {
            id: ColumnId::VariantOf,
            header: "Trader Variant Of",
            editable: true,
            filterable: true,
            operations: TEXT_OPS,
            dropdown: None,
        },
        Column::number(ColumnId::MaxPrice, "Max Price"),
        Column::number(ColumnId::MinPrice, "Min Price"),
        Column::number(ColumnId::SellPricePercent, "Sell Price %"),
        Column::number(ColumnId::MaxStock, "Max Stock"),
        Column::number(ColumnId::MinStock, "Min Stock"),
        Column::number(ColumnId::QuantityPercent, "Quantity %"),
        Column::list(ColumnId::SpawnAttachments, "Spawn Attachments", &[]),
        Column::list(ColumnId::Variants, "Variants", &[]),
        Column::number(ColumnId::Rarity, "Rarity"),
        Column::derived(ColumnId::Score, "Score"),
        Column::derived(ColumnId::EstimatedNominal, "Est. Nominal"),
        Column::derived(ColumnId::Rpm, "RPM"),
        Column::derived(ColumnId::MagSize, "Mag Size"),
        Column::derived(ColumnId::Dispersion, "Dispersion"),
        Column::derived(ColumnId::Damage, "Damage"),
        Column::derived(ColumnId::DamageHp, "Damage HP"),
        Column::derived(ColumnId::DamageBlood, "Damage Blood"),
        Column::derived(ColumnId::DamageArmor, "Damage Armor"),
        Column::derived(ColumnId::Damage100m, "Damage 100m"),
        Column::derived(ColumnId::OneShotDistance, "One Shot Distance"),
        Column::derived(ColumnId::BulletSpeed, "Bullet Speed"),
        Column::derived(ColumnId::Range, "Range"),
        Column::derived(ColumnId::RecoilX, "Stability"),
        Column::derived(ColumnId::RecoilY, "Recoil"),
        Column::derived(ColumnId::MaxCargo, "Max Cargo"),
        Column::derived(ColumnId::CargoSize, "Cargo Size"),
        Column::derived(ColumnId::WeaponSlots, "Weapon Slots"),
        Column::derived(ColumnId::PistolSlots, "Pistol Slots"),
        Column::derived(ColumnId::HitPoints, "Hitpoints"),
        Column::derived(ColumnId::ArmorProjectile, "Armor Projectile"),
        Column::derived(ColumnId::ArmorMelee, "Armor Melee"),
        Column::derived(ColumnId::ArmorFrag, "Armor Frag"),
        Column::derived(ColumnId::ArmorInfected, "Armor Infected"),
        Column::derived(ColumnId::Isolation, "Isolation"),
        Column::derived(ColumnId::Visibility, "Visibility"),
        Column::derived(ColumnId::LootCategory, "Loot Category"),
        Column::derived(ColumnId::LootTag, "Loot Tag"),
        Column::derived(ColumnId::ItemInfo, "Item Info"),
        Column::derived(ColumnId::Weight, "Weight"),
    ]
});

/// Lookup into [`COLUMNS`] by id.
pub fn column(id: ColumnId) -> &'static Column {
    COLUMNS
        .iter()
        .find(|column| column.id == id)
        .unwrap_or(&COLUMNS[0])
}

/// Whether a filter keeps matching rows or drops them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Includes,
    Excludes,
}

/// Exact or substring comparison for filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
}

/// One active filter over a column.
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    pub column: ColumnId,
    pub mode: FilterMode,
    pub match_kind: MatchKind,
    pub needle: String,
}

impl FilterPredicate {
    /// Apply the predicate to a row's cell value. List cells match when any
    /// element matches; empty needles and empty cells never match, so an
    /// `Includes` filter drops them and an `Excludes` filter keeps them.
    pub fn matches(&self, value: &CellValue) -> bool {
        let hit = self.hits(value);
        match self.mode {
            FilterMode::Includes => hit,
            FilterMode::Excludes => !hit,
        }
    }

    fn hits(&self, value: &CellValue) -> bool {
        if self.needle.is_empty() {
            return false;
        }
        let needle = self.needle.to_lowercase();
        let probe = |text: &str| {
            let text = text.to_lowercase();
            match self.match_kind {
                MatchKind::Exact => text == needle,
                MatchKind::Substring => text.contains(&needle),
            }
        };
        match value {
            CellValue::Empty => false,
            CellValue::Number(number) => probe(&CellValue::Number(*number).to_string()),
            CellValue::Text(text) => probe(text),
            CellValue::Flag(flag) => probe(if *flag { "1" } else { "0" }),
            CellValue::List(items) => items.iter().any(|item| probe(item)),
        }
    }
}

/// UI-independent rendering contract: turn a cell value into display text
/// and parse operator input back into a cell value.
pub trait CellRenderer {
    fn render(&self, value: &CellValue) -> String;
    fn parse_input(&self, input: &str) -> Option<CellValue>;
}

/// Plain text cells.
pub struct TextRenderer;

impl CellRenderer for TextRenderer {
    fn render(&self, value: &CellValue) -> String {
        value.to_string()
    }

    fn parse_input(&self, input: &str) -> Option<CellValue> {
        Some(CellValue::Text(input.trim().to_string()))
    }
}

/// Numeric cells.
pub struct NumberRenderer;

impl CellRenderer for NumberRenderer {
    fn render(&self, value: &CellValue) -> String {
        value.to_string()
    }

    fn parse_input(&self, input: &str) -> Option<CellValue> {
        input.trim().parse::<f64>().ok().map(CellValue::Number)
    }
}

/// Boolean flag cells, shown and entered as 0/1.
pub struct CheckboxRenderer;

impl CellRenderer for CheckboxRenderer {
    fn render(&self, value: &CellValue) -> String {
        value.to_string()
    }

    fn parse_input(&self, input: &str) -> Option<CellValue> {
        match input.trim() {
            "1" | "true" => Some(CellValue::Flag(true)),
            "0" | "false" => Some(CellValue::Flag(false)),
            _ => None,
        }
    }
}

/// Comma-joined list cells.
pub struct ListRenderer;

impl CellRenderer for ListRenderer {
    fn render(&self, value: &CellValue) -> String {
        value.to_string()
    }

    fn parse_input(&self, input: &str) -> Option<CellValue> {
        Some(CellValue::List(
            input
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

/// Hardline rarity cells, labelled in steps of ten.
pub struct RarityRenderer;

impl CellRenderer for RarityRenderer {
    fn render(&self, value: &CellValue) -> String {
        match value.as_number() {
            Some(rarity) if rarity >= 0.0 => {
                let idx = (rarity / 10.0) as usize;
                match RARITY_LABELS.get(idx) {
                    Some(label) => format!("{rarity} ({label})", rarity = rarity as i64),
                    None => (rarity as i64).to_string(),
                }
            }
            _ => value.to_string(),
        }
    }

    fn parse_input(&self, input: &str) -> Option<CellValue> {
        let input = input.trim();
        if let Ok(number) = input.parse::<f64>() {
            return Some(CellValue::Number(number));
        }
        RARITY_LABELS
            .iter()
            .position(|label| label.eq_ignore_ascii_case(input))
            .map(|idx| CellValue::Number(idx as f64 * 10.0))
    }
}

/// Renderer matching a column id.
pub fn renderer(id: ColumnId) -> Box<dyn CellRenderer> {
    match id {
        ColumnId::Name
        | ColumnId::TraderCategory
        | ColumnId::VariantOf
        | ColumnId::DisplayName
        | ColumnId::LootCategory => Box::new(TextRenderer),
        ColumnId::Categories
        | ColumnId::Usages
        | ColumnId::Tiers
        | ColumnId::SpawnAttachments
        | ColumnId::Variants
        | ColumnId::LootTag
        | ColumnId::ItemInfo => Box::new(ListRenderer),
        ColumnId::CountInCargo
        | ColumnId::CountInHoarder
        | ColumnId::CountInMap
        | ColumnId::CountInPlayer
        | ColumnId::Crafted
        | ColumnId::Deloot => Box::new(CheckboxRenderer),
        ColumnId::Rarity => Box::new(RarityRenderer),
        _ => Box::new(NumberRenderer),
    }
}
