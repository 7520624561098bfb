//! Shared domain models for the central-economy editor.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Count/crafting flags carried by a types entry, stored as `0`/`1`
/// attributes in the source format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeFlags {
    pub count_in_cargo: bool,
    pub count_in_hoarder: bool,
    pub count_in_map: bool,
    pub count_in_player: bool,
    pub crafted: bool,
    pub deloot: bool,
}

/// A single `<type>` record from a types file.
///
/// Numeric fields absent in the source are backfilled with their documented
/// defaults on parse (see [`crate::files::FileWrapper`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEntry {
    /// Classname; matched case-insensitively everywhere.
    pub name: String,
    pub categories: Vec<String>,
    pub usages: Vec<String>,
    /// Tier tags (`Tier1`..).
    pub values: Vec<String>,
    /// Present only when the source carried a `<flags>` element.
    pub flags: Option<TypeFlags>,
    pub nominal: i64,
    /// Despawn time in seconds. Stays absent for entries without a
    /// `<lifetime>` so saving does not invent one.
    pub lifetime: Option<i64>,
    pub restock: i64,
    pub min: i64,
    pub quantmin: i64,
    pub quantmax: i64,
    pub cost: i64,
}

/// One candidate item inside an attachment group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentCandidate {
    pub name: String,
    pub chance: f64,
}

/// An `<attachments>` group of a spawnable-types entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentGroup {
    pub chance: f64,
    pub items: Vec<AttachmentCandidate>,
}

/// A `<type>` record from `cfgspawnabletypes.xml`, reduced to the
/// attachment groups the editor resolves default attachments from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnableEntry {
    pub name: String,
    pub attachments: Vec<AttachmentGroup>,
}

/// Which reference-dump kind a classname resolved to during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Weapon,
    Ammo,
    Mag,
    Clothing,
    Item,
}

impl EntityKind {
    /// Short lower-case label used in log and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Weapon => "weapon",
            EntityKind::Ammo => "ammo",
            EntityKind::Mag => "mag",
            EntityKind::Clothing => "clothing",
            EntityKind::Item => "item",
        }
    }
}

fn one() -> f64 {
    1.0
}

fn one_i64() -> i64 {
    1
}

/// Fields shared by every dump record kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DumpBase {
    pub classname: String,
    pub source: String,
    pub parents: Vec<String>,
    pub display_name: String,
    #[serde(rename = "hitPoints")]
    pub hit_points: f64,
    pub weight: f64,
    pub size: Vec<f64>,
    pub inventory_slot: Vec<String>,
    pub loot_category: String,
    pub loot_tag: Vec<String>,
    pub item_info: Vec<String>,
}

/// A single firing mode of a weapon dump record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WeaponMode {
    pub name: String,
    pub rpm: f64,
    pub dispersion: f64,
    pub rounds: f64,
}

/// Weapon record from the weapon reference dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WeaponDump {
    #[serde(flatten)]
    pub base: DumpBase,
    pub noise: f64,
    pub magazine_switch_time: f64,
    #[serde(default = "one")]
    pub init_speed_multiplier: f64,
    pub optics_distance_zoom_min: f64,
    pub optics_distance_zoom_max: f64,
    pub optics_discrete_distance: Vec<f64>,
    pub recoil_mouse_offset_range_min: f64,
    pub recoil_mouse_offset_range_max: f64,
    pub recoil_mouse_offset_distance: f64,
    pub recoil_modifier: Vec<f64>,
    pub sway_modifier: Vec<f64>,
    #[serde(default = "one_i64")]
    pub chamber_size: i64,
    #[serde(default = "one_i64")]
    pub barrels: i64,
    pub color: String,
    pub ammo: Vec<String>,
    pub mags: Vec<String>,
    pub attachments: Vec<String>,
    pub modes: Vec<WeaponMode>,
}

/// Ammo record from the ammo reference dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AmmoDump {
    pub classname: String,
    pub source: String,
    pub parents: Vec<String>,
    pub display_name: String,
    pub projectile: String,
    pub simulation: String,
    pub hit: f64,
    pub indirect_hit: f64,
    pub indirect_hit_range: f64,
    pub init_speed: f64,
    pub typical_speed: f64,
    pub air_friction: f64,
    pub tracer: bool,
    pub explosive: bool,
    pub ttl: f64,
    pub weight: f64,
    pub caliber: f64,
    pub projectiles_count: f64,
    pub deflecting: f64,
    pub noise_hit: f64,
    #[serde(
        default = "default_damage_override",
        deserialize_with = "de_damage_override"
    )]
    pub damage_override: f64,
    #[serde(rename = "damageHP")]
    pub damage_hp: f64,
    pub damage_blood: f64,
    pub damage_shock: f64,
    pub damage_armor: f64,
}

/// Magazine record from the mag reference dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MagDump {
    pub classname: String,
    pub source: String,
    pub parents: Vec<String>,
    pub display_name: String,
    pub projectile: String,
    pub weight: f64,
    pub capacity: f64,
    pub weight_per_quantity_unit: f64,
    pub size: Vec<f64>,
    pub ammo: Vec<String>,
}

/// Clothing record from the clothing reference dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ClothingDump {
    #[serde(flatten)]
    pub base: DumpBase,
    pub heat_isolation: f64,
    pub visibility_modifier: f64,
    pub quick_bar_bonus: f64,
    pub durability: f64,
    #[serde(rename = "armorProjectileHP")]
    pub armor_projectile_hp: f64,
    pub armor_projectile_blood: f64,
    pub armor_projectile_shock: f64,
    #[serde(rename = "armorMeleeHP")]
    pub armor_melee_hp: f64,
    pub armor_melee_blood: f64,
    pub armor_melee_shock: f64,
    #[serde(rename = "armorFragHP")]
    pub armor_frag_hp: f64,
    pub armor_frag_blood: f64,
    pub armor_frag_shock: f64,
    #[serde(rename = "armorInfectedHP")]
    pub armor_infected_hp: f64,
    pub armor_infected_blood: f64,
    pub armor_infected_shock: f64,
    pub cargo_size: Vec<f64>,
    pub attachments: Vec<String>,
}

/// Generic item record from the item reference dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemDump {
    #[serde(flatten)]
    pub base: DumpBase,
    pub is_melee_weapon: bool,
    pub repair_kit_type: f64,
    pub cargo_size: Vec<f64>,
    pub attachments: Vec<String>,
    pub recoil_modifier: Vec<f64>,
    pub sway_modifier: Vec<f64>,
    pub noise_shoot_modifier: f64,
    pub dispersion_modifier: f64,
    pub optics_distance_zoom_min: f64,
    pub optics_distance_zoom_max: f64,
    pub optics_discrete_distance: Vec<f64>,
}

/// Trading-post record from a trader file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TraderItem {
    #[serde(rename = "ClassName")]
    pub class_name: String,
    #[serde(rename = "MaxPriceThreshold")]
    pub max_price_threshold: f64,
    #[serde(rename = "MinPriceThreshold")]
    pub min_price_threshold: f64,
    #[serde(rename = "SellPricePercent")]
    pub sell_price_percent: f64,
    #[serde(rename = "MaxStockThreshold")]
    pub max_stock_threshold: f64,
    #[serde(rename = "MinStockThreshold")]
    pub min_stock_threshold: f64,
    #[serde(rename = "QuantityPercent")]
    pub quantity_percent: f64,
    #[serde(rename = "SpawnAttachments")]
    pub spawn_attachments: Vec<String>,
    #[serde(rename = "Variants")]
    pub variants: Vec<String>,
}

impl Default for TraderItem {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl TraderItem {
    /// A fresh trader entry with the stock thresholds the editor uses when
    /// an item is added to a trader category for the first time.
    pub fn new(class_name: String) -> Self {
        Self {
            class_name,
            max_price_threshold: 10_000.0,
            min_price_threshold: 7_500.0,
            sell_price_percent: -1.0,
            max_stock_threshold: 100.0,
            min_stock_threshold: 1.0,
            quantity_percent: -1.0,
            spawn_attachments: Vec::new(),
            variants: Vec::new(),
        }
    }
}

/// A trader JSON document. Fields other than `Items` are carried opaquely
/// so saving does not drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraderFile {
    #[serde(rename = "Items", default)]
    pub items: Vec<TraderItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The hardline settings document holding the classname -> rarity map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HardlineFile {
    /// Keys are lower-cased classnames, values 0..=100.
    #[serde(rename = "ItemRarity", default)]
    pub item_rarity: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HardlineFile {
    /// Rarity for a classname, 0 when unknown.
    pub fn rarity(&self, classname: &str) -> i64 {
        self.item_rarity
            .get(&classname.to_lowercase())
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    /// Store a rarity under the lower-cased classname key.
    pub fn set_rarity(&mut self, classname: &str, rarity: i64) {
        self.item_rarity
            .insert(classname.to_lowercase(), Value::from(rarity));
    }
}

/// Round to the given number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn default_damage_override() -> f64 {
    0.9
}

// Some game builds emit damageOverride as a brace-list string like
// "{{0.5, 1.0}}"; take the first number, falling back to 0.9.
fn de_damage_override<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Number(num) => num.as_f64().unwrap_or(0.9),
        Value::String(text) => parse_brace_list(&text).unwrap_or(0.9),
        _ => 0.9,
    })
}

fn parse_brace_list(text: &str) -> Option<f64> {
    let inner = text.trim().trim_matches(|c| c == '{' || c == '}');
    let first = inner.split(',').next()?.trim();
    first.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_override_accepts_numbers_and_brace_lists() {
        let json = r#"[
            {"classname": "a", "damageOverride": 0.5},
            {"classname": "b", "damageOverride": "{{0.25, 1}}"},
            {"classname": "c", "damageOverride": ""},
            {"classname": "d"}
        ]"#;
        let ammo: Vec<AmmoDump> = serde_json::from_str(json).unwrap();
        assert_eq!(ammo[0].damage_override, 0.5);
        assert_eq!(ammo[1].damage_override, 0.25);
        assert_eq!(ammo[2].damage_override, 0.9);
        assert_eq!(ammo[3].damage_override, 0.9);
    }

    #[test]
    fn weapon_defaults_mirror_missing_dump_fields() {
        let weapon: WeaponDump = serde_json::from_str(r#"{"classname": "m4"}"#).unwrap();
        assert_eq!(weapon.init_speed_multiplier, 1.0);
        assert_eq!(weapon.chamber_size, 1);
        assert_eq!(weapon.barrels, 1);
    }

    #[test]
    fn hardline_rarity_is_case_insensitive() {
        let mut file = HardlineFile::default();
        file.set_rarity("AKM", 40);
        assert_eq!(file.rarity("akm"), 40);
        assert_eq!(file.rarity("AKM"), 40);
        assert_eq!(file.rarity("unknown"), 0);
    }
}
