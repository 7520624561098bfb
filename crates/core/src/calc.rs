//! Memoized derived-attribute engine over the reference dumps.
//!
//! Every query takes a classname and resolves it case-insensitively through
//! the [`EntityIndex`]. Results are cached per lower-cased classname; the
//! caches are dropped through [`ItemCalculator::invalidate`] whenever the
//! underlying entity set changes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::lookup::EntityIndex;
use crate::model::{round_to, AmmoDump, WeaponDump};

/// Recoil axis for [`ItemCalculator::weapon_recoil`]. `X` is horizontal
/// stability, `Y` vertical kick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoilAxis {
    X,
    Y,
}

/// Ammo attribute selected by [`ItemCalculator::weapon_ammo_prop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmoProp {
    DamageBlood,
    DamageHp,
    DamageArmor,
    InitSpeed,
}

impl AmmoProp {
    fn read(&self, ammo: &AmmoDump) -> f64 {
        match self {
            AmmoProp::DamageBlood => ammo.damage_blood,
            AmmoProp::DamageHp => ammo.damage_hp,
            AmmoProp::DamageArmor => ammo.damage_armor,
            AmmoProp::InitSpeed => ammo.init_speed,
        }
    }
}

#[derive(Debug, Default)]
struct Caches {
    slot_attachments: HashMap<String, Arc<[String]>>,
    default_attachments: HashMap<String, Arc<[String]>>,
    item_score: HashMap<String, Option<f64>>,
    estimated_nominal: HashMap<String, Option<i64>>,
    max_cargo: HashMap<String, f64>,
}

/// Scoring and ballistics calculator.
///
/// Holds a shared reference to the entity index; constructed by the session
/// and replaced together with the index on reload.
#[derive(Debug)]
pub struct ItemCalculator {
    index: RwLock<Arc<EntityIndex>>,
    caches: RwLock<Caches>,
}

impl ItemCalculator {
    pub fn new(index: Arc<EntityIndex>) -> Self {
        Self {
            index: RwLock::new(index),
            caches: RwLock::new(Caches::default()),
        }
    }

    /// Swap in a freshly built index and drop every memoized result.
    pub fn set_index(&self, index: Arc<EntityIndex>) {
        *self.index.write() = index;
        self.invalidate();
    }

    /// Drop all memoized results.
    pub fn invalidate(&self) {
        *self.caches.write() = Caches::default();
    }

    fn index(&self) -> Arc<EntityIndex> {
        self.index.read().clone()
    }

    /// All clothing/item classnames that can sit in the given inventory
    /// slot, lower-cased.
    pub fn slot_attachments(&self, slot: &str) -> Arc<[String]> {
        let key = slot.to_lowercase();
        if key.is_empty() {
            return Vec::new().into();
        }
        if let Some(hit) = self.caches.read().slot_attachments.get(&key) {
            return hit.clone();
        }

        let index = self.index();
        let mut names: Vec<String> = Vec::new();
        let fits = |slots: &[String]| slots.iter().any(|slot| slot.to_lowercase() == key);
        for record in index.clothing_records() {
            if fits(&record.base.inventory_slot) {
                names.push(record.base.classname.to_lowercase());
            }
        }
        for record in index.item_records() {
            if fits(&record.base.inventory_slot) {
                names.push(record.base.classname.to_lowercase());
            }
        }

        let names: Arc<[String]> = names.into();
        self.caches
            .write()
            .slot_attachments
            .insert(key, names.clone());
        names
    }

    /// Default attachment per spawnable group: groups with chance 1 pick
    /// their highest-chance candidate, ties resolved towards the later
    /// element after a stable ascending sort.
    pub fn default_attachments(&self, classname: &str) -> Arc<[String]> {
        let key = classname.to_lowercase();
        if key.is_empty() {
            return Vec::new().into();
        }
        if let Some(hit) = self.caches.read().default_attachments.get(&key) {
            return hit.clone();
        }

        let index = self.index();
        let mut names: Vec<String> = Vec::new();
        if let Some(entry) = index.spawnable(&key) {
            for group in &entry.attachments {
                if group.chance != 1.0 || group.items.is_empty() {
                    continue;
                }
                let mut candidates = group.items.clone();
                candidates.sort_by(|a, b| {
                    a.chance
                        .partial_cmp(&b.chance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                if let Some(last) = candidates.last() {
                    names.push(last.name.to_lowercase());
                }
            }
        }

        let names: Arc<[String]> = names.into();
        self.caches
            .write()
            .default_attachments
            .insert(key, names.clone());
        names
    }

    /// Total cargo area reachable from a classname: its own cargo grid plus
    /// the best candidate of every attachment slot, recursively. Items that
    /// can carry each other would recurse forever, so classnames already on
    /// the current path contribute zero.
    pub fn max_cargo_space(&self, classname: &str) -> f64 {
        let mut visiting = HashSet::new();
        self.max_cargo_inner(&classname.to_lowercase(), &mut visiting).0
    }

    /// Returns the total plus whether the visited-set cut a cycle while
    /// computing it. Truncated totals are valid for the current path only,
    /// so they are never cached.
    fn max_cargo_inner(&self, key: &str, visiting: &mut HashSet<String>) -> (f64, bool) {
        if let Some(hit) = self.caches.read().max_cargo.get(key) {
            return (*hit, false);
        }
        if !visiting.insert(key.to_string()) {
            return (0.0, true);
        }

        let index = self.index();
        let (cargo_size, slots) = match (index.clothing(key), index.item(key)) {
            (Some(clothing), _) => (&clothing.cargo_size, &clothing.attachments),
            (None, Some(item)) => (&item.cargo_size, &item.attachments),
            (None, None) => {
                visiting.remove(key);
                return (0.0, false);
            }
        };

        let mut total = if cargo_size.len() >= 2 {
            cargo_size[0] * cargo_size[1]
        } else {
            0.0
        };
        let mut truncated = false;
        for slot in slots {
            let mut best = 0.0f64;
            for candidate in self.slot_attachments(slot).iter() {
                let (space, cut) = self.max_cargo_inner(candidate, visiting);
                truncated |= cut;
                best = best.max(space);
            }
            total += best;
        }

        visiting.remove(key);
        if !truncated {
            self.caches
                .write()
                .max_cargo
                .insert(key.to_string(), total);
        }
        (total, truncated)
    }

    /// Dispatching score: weapons then clothing, `None` when the classname
    /// is neither or the weapon is excluded from scoring.
    pub fn item_score(&self, classname: &str) -> Option<f64> {
        let key = classname.to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(hit) = self.caches.read().item_score.get(&key) {
            return *hit;
        }

        let index = self.index();
        let score = if index.weapon(&key).is_some() {
            self.weapon_score(&key)
        } else if index.clothing(&key).is_some() {
            self.clothing_score(&key)
        } else {
            None
        };

        self.caches.write().item_score.insert(key, score);
        score
    }

    /// Composite weapon score. Archery and launcher weapons are excluded
    /// and yield `None`, distinct from a computed zero.
    pub fn weapon_score(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        if self.is_archery_weapon(weapon, &index) || self.is_launcher_weapon(weapon, &index) {
            return None;
        }

        let ammo_max = |prop: AmmoProp| {
            weapon
                .ammo
                .iter()
                .filter_map(|name| index.ammo(name))
                .map(|ammo| prop.read(ammo))
                .fold(0.0f64, f64::max)
        };

        let dmg = ammo_max(AmmoProp::DamageHp);
        let armor_dmg = ammo_max(AmmoProp::DamageArmor);
        let bullet_speed = (weapon.init_speed_multiplier * ammo_max(AmmoProp::InitSpeed)).round();

        let max_capacity = weapon
            .mags
            .iter()
            .filter_map(|name| index.mag(name))
            .map(|mag| mag.capacity)
            .fold(0.0f64, f64::max);
        let max_mag_size =
            (max_capacity + (weapon.chamber_size * weapon.barrels) as f64).round();

        let dispersion = weapon
            .modes
            .iter()
            .map(|mode| mode.dispersion)
            .fold(f64::INFINITY, f64::min);
        let dispersion = if dispersion.is_finite() {
            (dispersion * 10_000.0).round()
        } else {
            0.0
        };
        let rpm = weapon
            .modes
            .iter()
            .map(|mode| mode.rpm)
            .fold(0.0f64, f64::max)
            .round();

        let hit_chance = (1000.0 - dispersion) / 1000.0;
        let combat_window_chance =
            max_mag_size.min(rpm / 60.0 * 5.0) / 100.0 * hit_chance * 100.0;
        let dmg_score = dmg / 150.0 * 100.0;

        let score = combat_window_chance + bullet_speed / 8.0 + dmg_score + dmg * armor_dmg / 2.5;
        Some(score.ceil())
    }

    /// Clothing score. The weighting of the gathered attributes was never
    /// finished upstream; the cargo/armor/isolation terms are collected but
    /// the result is a flat zero until a formula lands.
    pub fn clothing_score(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let clothing = index.clothing(classname)?;

        let _cargo = self.max_cargo_space(classname);
        let _armor_avg = ((clothing.armor_infected_hp + clothing.armor_projectile_hp) / 2.0
            * clothing.base.hit_points)
            .round();
        let _isolation = (clothing.heat_isolation * 10.0).round();
        let _visibility_bonus = ((100.0 - clothing.visibility_modifier * 100.0) / 2.0).round();

        Some(0.0)
    }

    /// Suggested nominal derived from the item score through an easing
    /// curve, `None` for unscoreable classnames.
    pub fn estimated_nominal(&self, classname: &str) -> Option<i64> {
        let key = classname.to_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(hit) = self.caches.read().estimated_nominal.get(&key) {
            return *hit;
        }

        let estimate = self.item_score(&key).map(|score| {
            let perc = 1.0 - (score.ceil() / 300.0).min(1.0);
            let eased = if perc < 0.5 {
                if perc <= 0.005 {
                    0.005
                } else {
                    1.75 * perc * perc
                }
            } else if perc >= 0.95 {
                0.95
            } else {
                1.0 - 0.3 * (-1.5 * perc + 2.0).powi(3) + 0.02
            };
            (eased * 30.0).ceil() as i64
        });

        self.caches.write().estimated_nominal.insert(key, estimate);
        estimate
    }

    fn is_archery_weapon(&self, weapon: &WeaponDump, index: &EntityIndex) -> bool {
        index.is_kind_of(&weapon.base.classname, "Archery_Base")
            || index.is_kind_of(&weapon.base.classname, "ExpansionCrossbow_Base")
            || weapon.ammo.iter().any(|name| {
                index
                    .ammo(name)
                    .map(|ammo| ammo.simulation.to_lowercase().contains("arrow"))
                    .unwrap_or(false)
            })
    }

    fn is_launcher_weapon(&self, weapon: &WeaponDump, index: &EntityIndex) -> bool {
        index.is_kind_of(&weapon.base.classname, "Launcher_Base")
            || weapon.ammo.iter().any(|name| {
                let lower = name.to_lowercase();
                if lower.contains("m203") && lower.contains("he") {
                    return true;
                }
                index
                    .ammo(name)
                    .map(|ammo| ammo.explosive || ammo.projectile.to_lowercase().contains("rocket"))
                    .unwrap_or(false)
            })
    }

    /// Maximum ammo attribute across a weapon's chamberable ammo types.
    pub fn weapon_ammo_prop(&self, prop: AmmoProp, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        Some(
            weapon
                .ammo
                .iter()
                .filter_map(|name| index.ammo(name))
                .map(|ammo| prop.read(ammo))
                .fold(0.0f64, f64::max),
        )
    }

    /// Displayed dispersion percentage including default-attachment
    /// modifiers.
    pub fn weapon_dispersion(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        let base = weapon
            .modes
            .iter()
            .map(|mode| mode.dispersion)
            .fold(0.0f64, f64::max);
        let modifier: f64 = self
            .default_attachments(classname)
            .iter()
            .filter_map(|name| index.item(name))
            .map(|item| item.dispersion_modifier)
            .sum();
        Some(((base + modifier) * 100_000.0).round() / 100.0)
    }

    pub fn weapon_rpm(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        Some(
            weapon
                .modes
                .iter()
                .map(|mode| mode.rpm)
                .fold(0.0f64, f64::max)
                .round(),
        )
    }

    /// Largest magazine capacity plus the chambered rounds.
    pub fn weapon_max_mag_size(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        let capacity = weapon
            .mags
            .iter()
            .filter_map(|name| index.mag(name))
            .map(|mag| mag.capacity)
            .fold(0.0f64, f64::max);
        Some((capacity + (weapon.chamber_size * weapon.barrels) as f64).round())
    }

    /// Muzzle velocity of the fastest chamberable ammo.
    pub fn weapon_bullet_speed(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        let init_speed = self.weapon_ammo_prop(AmmoProp::InitSpeed, classname)?;
        Some((weapon.init_speed_multiplier * init_speed).round())
    }

    /// Muzzle damage of the hardest-hitting ammo, scaled by the relative
    /// speed factor of the barrel.
    pub fn weapon_damage(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        let ammo = weapon
            .ammo
            .iter()
            .filter_map(|name| index.ammo(name))
            .max_by(|a, b| {
                a.damage_hp
                    .partial_cmp(&b.damage_hp)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

        let typical = if ammo.typical_speed > 0.0 {
            ammo.typical_speed
        } else {
            ammo.init_speed
        };
        let factor = if typical > 0.0 {
            weapon.init_speed_multiplier * ammo.init_speed / typical
        } else {
            weapon.init_speed_multiplier
        };
        Some(ammo.damage_hp * factor)
    }

    /// Remaining damage after air drag over the given distance.
    pub fn weapon_damage_at_distance(&self, classname: &str, distance: f64) -> Option<f64> {
        let start = self.weapon_damage(classname)?;
        let friction = self.min_air_friction(classname)?;
        Some(start * (friction * distance).exp())
    }

    /// Distance at which damage decays to the given value, one decimal.
    pub fn weapon_damage_distance(&self, classname: &str, damage: f64) -> Option<f64> {
        let start = self.weapon_damage(classname)?;
        if start == 0.0 {
            return None;
        }
        let mut friction = self.min_air_friction(classname)?;
        if friction >= 0.0 {
            friction = -1.0;
        }
        Some(round_to((damage / start).ln() / friction, 1))
    }

    fn min_air_friction(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        let friction = weapon
            .ammo
            .iter()
            .filter_map(|name| index.ammo(name))
            .map(|ammo| ammo.air_friction)
            .fold(f64::INFINITY, f64::min);
        friction.is_finite().then_some(friction)
    }

    /// Longest zeroing distance, falling back to the default-attachment
    /// optics when the weapon itself has fewer than two discrete stops.
    pub fn weapon_range(&self, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;
        let discrete_max = weapon
            .optics_discrete_distance
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let own = if discrete_max.is_finite() {
            discrete_max.max(weapon.optics_distance_zoom_max).max(25.0)
        } else {
            weapon.optics_distance_zoom_max.max(25.0)
        };

        if weapon.optics_discrete_distance.len() < 2 {
            let attachment_max = self
                .default_attachments(classname)
                .iter()
                .filter_map(|name| index.item(name))
                .map(|item| {
                    item.optics_discrete_distance
                        .iter()
                        .copied()
                        .fold(25.0f64, f64::max)
                        .max(item.optics_distance_zoom_max)
                })
                .fold(25.0f64, f64::max);
            return Some(own.max(attachment_max));
        }
        Some(own)
    }

    /// Number of attachment slots on a clothing or item record whose slot
    /// name contains the given fragment, e.g. `"shoulder"` for carried
    /// long guns or `"pistol"` for holsters.
    pub fn slot_count(&self, classname: &str, fragment: &str) -> Option<f64> {
        let index = self.index();
        let slots = match (index.clothing(classname), index.item(classname)) {
            (Some(clothing), _) => &clothing.attachments,
            (None, Some(item)) => &item.attachments,
            (None, None) => return None,
        };
        let fragment = fragment.to_lowercase();
        Some(
            slots
                .iter()
                .filter(|slot| slot.to_lowercase().contains(&fragment))
                .count() as f64,
        )
    }

    /// Recoil scores: `X` is horizontal stability out of 100, `Y` vertical
    /// kick out of 100, both after default-attachment modifiers.
    pub fn weapon_recoil(&self, axis: RecoilAxis, classname: &str) -> Option<f64> {
        let index = self.index();
        let weapon = index.weapon(classname)?;

        let mut recoil = match axis {
            RecoilAxis::X => weapon.recoil_mouse_offset_range_max - weapon.recoil_mouse_offset_range_min,
            RecoilAxis::Y => weapon.recoil_mouse_offset_distance,
        };

        let modifier_idx = match axis {
            RecoilAxis::X => 0,
            RecoilAxis::Y => 1,
        };
        let attachment_modifier: f64 = self
            .default_attachments(classname)
            .iter()
            .filter_map(|name| index.item(name))
            .filter_map(|item| item.recoil_modifier.get(modifier_idx).copied())
            .product();
        recoil *= attachment_modifier;
        recoil *= weapon.recoil_modifier.get(modifier_idx).copied().unwrap_or(1.0);

        Some(match axis {
            RecoilAxis::X => round_to(100.0 - (100.0 * recoil.abs() / 180.0).max(0.0).round(), 1),
            RecoilAxis::Y => round_to((10.0 - recoil) * 10.0, 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{FileContent, FileKind, FileWrapper};
    use crate::model::{
        AttachmentCandidate, AttachmentGroup, ClothingDump, DumpBase, ItemDump, MagDump,
        SpawnableEntry, WeaponMode,
    };

    fn dump_file(kind: FileKind, content: FileContent) -> FileWrapper {
        let mut file = FileWrapper::new(kind, "dump.json");
        file.content = content;
        file
    }

    fn test_weapon() -> WeaponDump {
        WeaponDump {
            base: DumpBase {
                classname: "TestRifle".to_string(),
                ..DumpBase::default()
            },
            init_speed_multiplier: 1.0,
            chamber_size: 1,
            barrels: 1,
            ammo: vec!["Ammo_Test".to_string()],
            mags: vec!["Mag_Test30".to_string()],
            modes: vec![WeaponMode {
                name: "FullAuto".to_string(),
                rpm: 600.0,
                dispersion: 0.001,
                rounds: -1.0,
            }],
            ..WeaponDump::default()
        }
    }

    fn test_ammo() -> AmmoDump {
        AmmoDump {
            classname: "Ammo_Test".to_string(),
            damage_hp: 100.0,
            damage_armor: 0.0,
            init_speed: 800.0,
            ..AmmoDump::default()
        }
    }

    fn test_mag() -> MagDump {
        MagDump {
            classname: "Mag_Test30".to_string(),
            capacity: 30.0,
            ..MagDump::default()
        }
    }

    fn calculator(files: Vec<FileWrapper>) -> ItemCalculator {
        ItemCalculator::new(Arc::new(EntityIndex::build(&files)))
    }

    fn scoring_calculator() -> ItemCalculator {
        calculator(vec![
            dump_file(FileKind::WeaponDump, FileContent::Weapons(vec![test_weapon()])),
            dump_file(FileKind::AmmoDump, FileContent::Ammo(vec![test_ammo()])),
            dump_file(FileKind::MagDump, FileContent::Mags(vec![test_mag()])),
        ])
    }

    #[test]
    fn weapon_score_composes_ballistics() {
        let calc = scoring_calculator();
        // dispersion 10 -> hit chance 0.99, combat window min(31, 50)=31,
        // cwc 30.69, speed bonus 100, dmg score 66.67 -> ceil 198
        assert_eq!(calc.weapon_score("TestRifle"), Some(198.0));
        assert_eq!(calc.item_score("testrifle"), Some(198.0));
    }

    #[test]
    fn estimated_nominal_eases_the_score() {
        let calc = scoring_calculator();
        // perc = 1 - 198/300 = 0.34 -> 1.75 * 0.34^2 = 0.2023 -> ceil(*30) = 7
        assert_eq!(calc.estimated_nominal("TestRifle"), Some(7));
    }

    #[test]
    fn launcher_and_archery_weapons_are_not_scored() {
        let mut launcher = test_weapon();
        launcher.base.classname = "TestLauncher".to_string();
        launcher.base.parents = vec!["Launcher_Base".to_string()];
        let mut bow = test_weapon();
        bow.base.classname = "TestBow".to_string();
        bow.base.parents = vec!["Archery_Base".to_string()];
        let mut explosive_ammo = test_ammo();
        explosive_ammo.classname = "Ammo_Grenade".to_string();
        explosive_ammo.explosive = true;
        let mut grenadier = test_weapon();
        grenadier.base.classname = "TestGrenadier".to_string();
        grenadier.ammo = vec!["Ammo_Grenade".to_string()];

        let calc = calculator(vec![
            dump_file(
                FileKind::WeaponDump,
                FileContent::Weapons(vec![launcher, bow, grenadier]),
            ),
            dump_file(
                FileKind::AmmoDump,
                FileContent::Ammo(vec![test_ammo(), explosive_ammo]),
            ),
        ]);

        assert_eq!(calc.weapon_score("TestLauncher"), None);
        assert_eq!(calc.weapon_score("TestBow"), None);
        assert_eq!(calc.weapon_score("TestGrenadier"), None);
        assert_eq!(calc.estimated_nominal("TestLauncher"), None);
    }

    #[test]
    fn clothing_score_is_a_flat_zero() {
        let clothing = ClothingDump {
            base: DumpBase {
                classname: "TestVest".to_string(),
                hit_points: 100.0,
                ..DumpBase::default()
            },
            armor_projectile_hp: 0.5,
            heat_isolation: 0.7,
            cargo_size: vec![4.0, 3.0],
            ..ClothingDump::default()
        };
        let calc = calculator(vec![dump_file(
            FileKind::ClothingDump,
            FileContent::Clothing(vec![clothing]),
        )]);
        assert_eq!(calc.item_score("TestVest"), Some(0.0));
        assert_eq!(calc.item_score("NotAThing"), None);
    }

    #[test]
    fn default_attachments_pick_highest_chance_from_certain_groups() {
        let spawnable = SpawnableEntry {
            name: "TestRifle".to_string(),
            attachments: vec![
                AttachmentGroup {
                    chance: 1.0,
                    items: vec![
                        AttachmentCandidate {
                            name: "OpticA".to_string(),
                            chance: 0.3,
                        },
                        AttachmentCandidate {
                            name: "OpticB".to_string(),
                            chance: 0.7,
                        },
                    ],
                },
                AttachmentGroup {
                    chance: 0.5,
                    items: vec![AttachmentCandidate {
                        name: "Suppressor".to_string(),
                        chance: 1.0,
                    }],
                },
            ],
        };
        let mut file = FileWrapper::new(FileKind::SpawnableTypes, "cfgspawnabletypes.xml");
        file.content = FileContent::Spawnable(vec![spawnable]);
        let calc = calculator(vec![file]);

        let defaults = calc.default_attachments("testrifle");
        assert_eq!(defaults.as_ref(), ["opticb"]);
    }

    fn pouch(classname: &str, slot: &str, cargo: [f64; 2], slots: Vec<String>) -> ItemDump {
        ItemDump {
            base: DumpBase {
                classname: classname.to_string(),
                inventory_slot: vec![slot.to_string()],
                ..DumpBase::default()
            },
            cargo_size: cargo.to_vec(),
            attachments: slots,
            ..ItemDump::default()
        }
    }

    #[test]
    fn max_cargo_takes_best_candidate_per_slot() {
        let vest = ClothingDump {
            base: DumpBase {
                classname: "Vest".to_string(),
                ..DumpBase::default()
            },
            cargo_size: vec![4.0, 3.0],
            attachments: vec!["VestPouch".to_string()],
            ..ClothingDump::default()
        };
        let calc = calculator(vec![
            dump_file(FileKind::ClothingDump, FileContent::Clothing(vec![vest])),
            dump_file(
                FileKind::ItemDump,
                FileContent::Items(vec![
                    pouch("SmallPouch", "VestPouch", [2.0, 2.0], Vec::new()),
                    pouch("BigPouch", "VestPouch", [3.0, 3.0], Vec::new()),
                ]),
            ),
        ]);
        assert_eq!(calc.max_cargo_space("vest"), 12.0 + 9.0);
        // slotless pouches carry only their own grid
        assert_eq!(calc.max_cargo_space("BigPouch"), 9.0);
        assert_eq!(calc.max_cargo_space("missing"), 0.0);
    }

    #[test]
    fn max_cargo_survives_attachment_cycles() {
        let calc = calculator(vec![dump_file(
            FileKind::ItemDump,
            FileContent::Items(vec![
                pouch("LoopA", "SlotB", [2.0, 1.0], vec!["SlotA".to_string()]),
                pouch("LoopB", "SlotA", [3.0, 1.0], vec!["SlotB".to_string()]),
            ]),
        )]);
        // LoopA holds LoopB which would hold LoopA again; the repeat
        // contributes nothing.
        assert_eq!(calc.max_cargo_space("LoopA"), 2.0 + 3.0);
    }

    #[test]
    fn cycle_totals_do_not_depend_on_query_order() {
        let files = vec![dump_file(
            FileKind::ItemDump,
            FileContent::Items(vec![
                pouch("LoopA", "SlotB", [2.0, 1.0], vec!["SlotA".to_string()]),
                pouch("LoopB", "SlotA", [3.0, 1.0], vec!["SlotB".to_string()]),
            ]),
        )];

        let fresh = calculator(files.clone());
        assert_eq!(fresh.max_cargo_space("LoopB"), 3.0 + 2.0);

        // the LoopB total seen mid-cycle while resolving LoopA is
        // truncated and must not stick in the cache
        let calc = calculator(files);
        assert_eq!(calc.max_cargo_space("LoopA"), 5.0);
        assert_eq!(calc.max_cargo_space("LoopB"), 5.0);
    }

    #[test]
    fn slot_count_matches_slot_name_fragments() {
        let vest = ClothingDump {
            base: DumpBase {
                classname: "TestBackpack".to_string(),
                ..DumpBase::default()
            },
            attachments: vec![
                "Shoulder".to_string(),
                "MeleeShoulder".to_string(),
                "PistolHolster".to_string(),
            ],
            ..ClothingDump::default()
        };
        let calc = calculator(vec![dump_file(
            FileKind::ClothingDump,
            FileContent::Clothing(vec![vest]),
        )]);
        assert_eq!(calc.slot_count("testbackpack", "shoulder"), Some(2.0));
        assert_eq!(calc.slot_count("TestBackpack", "pistol"), Some(1.0));
        assert_eq!(calc.slot_count("NotAThing", "shoulder"), None);
    }

    #[test]
    fn invalidate_drops_memoized_scores() {
        let calc = scoring_calculator();
        assert_eq!(calc.weapon_score("TestRifle"), Some(198.0));
        calc.set_index(Arc::new(EntityIndex::build(&[])));
        assert_eq!(calc.weapon_score("TestRifle"), None);
        assert_eq!(calc.item_score("TestRifle"), None);
    }

    #[test]
    fn display_getters_follow_the_dump_values() {
        let calc = scoring_calculator();
        assert_eq!(calc.weapon_rpm("TestRifle"), Some(600.0));
        assert_eq!(calc.weapon_max_mag_size("TestRifle"), Some(31.0));
        assert_eq!(calc.weapon_bullet_speed("TestRifle"), Some(800.0));
        assert_eq!(calc.weapon_damage("TestRifle"), Some(100.0));
        assert_eq!(calc.weapon_dispersion("TestRifle"), Some(1.0));
        assert_eq!(calc.weapon_range("TestRifle"), Some(25.0));
        assert_eq!(calc.weapon_rpm("NotAWeapon"), None);
    }
}
